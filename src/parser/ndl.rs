use regex::Regex;
use std::sync::OnceLock;

use super::{parse_tree, XmlNode};
use crate::error::{CatalogError, Result};
use crate::models::NewBook;

static NDC_PATTERN: OnceLock<Regex> = OnceLock::new();

fn ndc_pattern() -> &'static Regex {
    NDC_PATTERN.get_or_init(|| Regex::new(r"ndc[89]/(\d+\.\d+)").expect("valid ndc regex"))
}

/// Map an SRU `searchRetrieve` response (dcndl schema) onto a book for `isbn`.
///
/// Only the first record is used. A response without any record is `NotFound`.
pub fn parse_search_response(xml: &str, isbn: &str) -> Result<NewBook> {
    let tree = parse_tree(xml)?;
    let response = tree
        .find_local("searchRetrieveResponse")
        .ok_or_else(|| CatalogError::Malformed("missing searchRetrieveResponse".to_string()))?;

    let count = response
        .find_local("numberOfRecords")
        .and_then(|node| node.text().parse::<u64>().ok());
    if count == Some(0) {
        return Err(CatalogError::NotFound(isbn.to_string()));
    }

    let record = response
        .find_local("records")
        .and_then(|records| records.children.iter().find(|child| child.local_name() == "record"))
        .ok_or_else(|| CatalogError::NotFound(isbn.to_string()))?;
    let bib = record
        .find("dcndl:BibResource")
        .ok_or_else(|| CatalogError::NotFound(isbn.to_string()))?;

    let (_, title_ruby) = described_value(bib, "dc:title");
    let (alt_title, alt_title_ruby) = described_value(bib, "dcndl:alternative");
    let (series, series_ruby) = described_value(bib, "dcndl:seriesTitle");

    let book = NewBook {
        isbn: isbn.to_string(),
        title: child_text(bib, "dcterms:title"),
        title_ruby,
        alt_title,
        alt_title_ruby,
        series,
        series_ruby,
        creators: extract_creators(bib),
        publisher: bib
            .children_named("dcterms:publisher")
            .filter_map(|publisher| publisher.path(&["foaf:Agent", "foaf:name"]))
            .map(|name| name.text().to_string())
            .find(|name| !name.is_empty())
            .unwrap_or_default(),
        date: Some(child_text(bib, "dcterms:date"))
            .filter(|date| !date.is_empty())
            .unwrap_or_else(|| child_text(bib, "dcterms:issued")),
        price: parse_price(&child_text(bib, "dcndl:price")),
        pages: child_text(bib, "dcterms:extent"),
        ndc: bib
            .children_named("dcterms:subject")
            .filter_map(|subject| subject.attr("rdf:resource"))
            .find_map(extract_ndc)
            .unwrap_or_default(),
        location1: String::new(),
        location2: String::new(),
        url: record_url(record, bib),
    };
    Ok(book)
}

fn child_text(node: &XmlNode, name: &str) -> String {
    node.child(name)
        .map(|child| child.text().to_string())
        .unwrap_or_default()
}

/// `<name><rdf:Description><rdf:value/><dcndl:transcription/></rdf:Description></name>`
fn described_value(bib: &XmlNode, name: &str) -> (String, String) {
    bib.children_named(name)
        .find_map(|node| node.child("rdf:Description"))
        .map(|desc| {
            (
                child_text(desc, "rdf:value"),
                child_text(desc, "dcndl:transcription"),
            )
        })
        .unwrap_or_default()
}

fn extract_creators(bib: &XmlNode) -> String {
    let agents: Vec<&str> = bib
        .children_named("dcterms:creator")
        .filter_map(|creator| creator.path(&["foaf:Agent", "foaf:name"]))
        .map(|name| name.text())
        .filter(|name| !name.is_empty())
        .collect();
    if !agents.is_empty() {
        return agents.join(", ");
    }

    bib.children_named("dc:creator")
        .map(|creator| creator.text())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn record_url(record: &XmlNode, bib: &XmlNode) -> String {
    if let Some(about) = record
        .find("dcndl:BibAdminResource")
        .and_then(|admin| admin.attr("rdf:about"))
    {
        return about.to_string();
    }
    bib.attr("rdf:about")
        .map(|about| about.split('#').next().unwrap_or(about).to_string())
        .unwrap_or_default()
}

/// Keep only the digits of a registry price such as `1,800円`; 0 when nothing usable.
pub fn parse_price(raw: &str) -> i64 {
    let digits: String = raw.chars().filter(|ch| ch.is_ascii_digit()).collect();
    digits.parse::<i64>().unwrap_or(0)
}

/// Numeric NDC code from a subject reference like `http://id.ndl.go.jp/class/ndc9/007.6`.
pub fn extract_ndc(reference: &str) -> Option<String> {
    if !reference.contains("ndc") {
        return None;
    }
    ndc_pattern()
        .captures(reference)
        .and_then(|captures| captures.get(1))
        .map(|code| code.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(count: u32, records: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<searchRetrieveResponse xmlns="http://www.loc.gov/zing/srw/">
  <version>1.2</version>
  <numberOfRecords>{}</numberOfRecords>
  <nextRecordPosition>0</nextRecordPosition>
  <records>{}</records>
</searchRetrieveResponse>"#,
            count, records
        )
    }

    fn record(bib_body: &str) -> String {
        format!(
            r#"<record>
  <recordSchema>info:ndl-dcndl</recordSchema>
  <recordPacking>xml</recordPacking>
  <recordData>
    <rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
             xmlns:dcterms="http://purl.org/dc/terms/"
             xmlns:dc="http://purl.org/dc/elements/1.1/"
             xmlns:dcndl="http://ndl.go.jp/dcndl/terms/"
             xmlns:foaf="http://xmlns.com/foaf/0.1/">
      <dcndl:BibAdminResource rdf:about="https://ndlsearch.ndl.go.jp/books/R100000002-I000001">
        <dcndl:record rdf:resource="https://ndlsearch.ndl.go.jp/books/R100000002-I000001#material"/>
      </dcndl:BibAdminResource>
      <dcndl:BibResource rdf:about="https://ndlsearch.ndl.go.jp/books/R100000002-I000001#material">
        {}
      </dcndl:BibResource>
    </rdf:RDF>
  </recordData>
  <recordPosition>1</recordPosition>
</record>"#,
            bib_body
        )
    }

    #[test]
    fn minimal_record_fills_defaults() {
        let xml = envelope(
            1,
            &record(
                r#"<dcterms:title>計算機プログラムの構造と解釈</dcterms:title>
        <dcterms:creator><foaf:Agent><foaf:name>Abelson, Harold</foaf:name></foaf:Agent></dcterms:creator>
        <dcterms:publisher><foaf:Agent><foaf:name>翔泳社</foaf:name></foaf:Agent></dcterms:publisher>
        <dcterms:subject rdf:resource="http://id.ndl.go.jp/class/ndc9/007.6"/>"#,
            ),
        );

        let book = parse_search_response(&xml, "9784798135984").unwrap();
        assert_eq!(book.isbn, "9784798135984");
        assert_eq!(book.title, "計算機プログラムの構造と解釈");
        assert_eq!(book.creators, "Abelson, Harold");
        assert_eq!(book.publisher, "翔泳社");
        assert_eq!(book.ndc, "007.6");
        assert_eq!(book.price, 0);
        assert_eq!(
            book.url,
            "https://ndlsearch.ndl.go.jp/books/R100000002-I000001"
        );
        for unset in [
            &book.title_ruby,
            &book.alt_title,
            &book.alt_title_ruby,
            &book.series,
            &book.series_ruby,
            &book.location1,
            &book.location2,
            &book.date,
            &book.pages,
        ] {
            assert_eq!(unset, "");
        }
    }

    #[test]
    fn full_record_maps_every_field() {
        let xml = envelope(
            1,
            &record(
                r#"<dcterms:title>吾輩は猫である</dcterms:title>
        <dc:title><rdf:Description><rdf:value>吾輩は猫である</rdf:value><dcndl:transcription>ワガハイ ワ ネコ デ アル</dcndl:transcription></rdf:Description></dc:title>
        <dcndl:alternative><rdf:Description><rdf:value>I Am a Cat</rdf:value><dcndl:transcription>アイ アム ア キャット</dcndl:transcription></rdf:Description></dcndl:alternative>
        <dcndl:seriesTitle><rdf:Description><rdf:value>新潮文庫</rdf:value><dcndl:transcription>シンチョウ ブンコ</dcndl:transcription></rdf:Description></dcndl:seriesTitle>
        <dcterms:creator><foaf:Agent rdf:about="http://id.ndl.go.jp/auth/entity/00001"><foaf:name>夏目, 漱石</foaf:name></foaf:Agent></dcterms:creator>
        <dcterms:creator><foaf:Agent><foaf:name>注釈者, 一郎</foaf:name></foaf:Agent></dcterms:creator>
        <dc:creator>夏目漱石 著</dc:creator>
        <dcterms:publisher><foaf:Agent><foaf:name>新潮社</foaf:name></foaf:Agent></dcterms:publisher>
        <dcterms:date>2003.6</dcterms:date>
        <dcterms:issued>2003</dcterms:issued>
        <dcndl:price>1,234円</dcndl:price>
        <dcterms:extent>610p ; 16cm</dcterms:extent>
        <dcterms:subject><rdf:Description rdf:about="http://id.ndl.go.jp/auth/ndlsh/00001"><rdf:value>小説</rdf:value></rdf:Description></dcterms:subject>
        <dcterms:subject rdf:resource="http://id.ndl.go.jp/class/ndlc/KH311"/>
        <dcterms:subject rdf:resource="http://id.ndl.go.jp/class/ndc8/913.6"/>
        <dcterms:subject rdf:resource="http://id.ndl.go.jp/class/ndc9/913.61"/>"#,
            ),
        );

        let book = parse_search_response(&xml, "4101010013").unwrap();
        assert_eq!(book.title_ruby, "ワガハイ ワ ネコ デ アル");
        assert_eq!(book.alt_title, "I Am a Cat");
        assert_eq!(book.alt_title_ruby, "アイ アム ア キャット");
        assert_eq!(book.series, "新潮文庫");
        assert_eq!(book.series_ruby, "シンチョウ ブンコ");
        assert_eq!(book.creators, "夏目, 漱石, 注釈者, 一郎");
        assert_eq!(book.date, "2003.6");
        assert_eq!(book.price, 1234);
        assert_eq!(book.pages, "610p ; 16cm");
        // First matching subject in document order wins.
        assert_eq!(book.ndc, "913.6");
    }

    #[test]
    fn falls_back_to_plain_creators_and_issued_date() {
        let xml = envelope(
            1,
            &record(
                r#"<dcterms:title>Untitled</dcterms:title>
        <dc:creator>First Author</dc:creator>
        <dc:creator>Second Author</dc:creator>
        <dcterms:issued>1999</dcterms:issued>"#,
            ),
        );
        let book = parse_search_response(&xml, "1").unwrap();
        assert_eq!(book.creators, "First Author, Second Author");
        assert_eq!(book.date, "1999");
        assert_eq!(book.publisher, "");
    }

    #[test]
    fn zero_records_is_not_found() {
        let err = parse_search_response(&envelope(0, ""), "0000000000").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(ref isbn) if isbn == "0000000000"));
    }

    #[test]
    fn record_without_bib_resource_is_not_found() {
        let xml = envelope(1, "<record><recordData/></record>");
        let err = parse_search_response(&xml, "1").unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }

    #[test]
    fn garbage_is_malformed() {
        let err = parse_search_response("<html><body>oops</body></html>", "1").unwrap_err();
        assert!(matches!(err, CatalogError::Malformed(_)));
    }

    #[test]
    fn price_strips_non_digits() {
        assert_eq!(parse_price("2,400円"), 2400);
        assert_eq!(parse_price("定価 980 yen"), 980);
        assert_eq!(parse_price("価格不明"), 0);
        assert_eq!(parse_price(""), 0);
        assert_eq!(parse_price("99999999999999999999999"), 0);
    }

    #[test]
    fn ndc_needs_version_tag_and_code() {
        assert_eq!(
            extract_ndc("http://id.ndl.go.jp/class/ndc9/007.6").as_deref(),
            Some("007.6")
        );
        assert_eq!(
            extract_ndc("http://id.ndl.go.jp/class/ndc8/913.61").as_deref(),
            Some("913.61")
        );
        assert_eq!(extract_ndc("http://id.ndl.go.jp/class/ndc8/913"), None);
        assert_eq!(extract_ndc("http://id.ndl.go.jp/class/ndlc/KH311"), None);
        assert_eq!(extract_ndc("http://id.ndl.go.jp/class/ndc10/007.6"), None);
        assert_eq!(extract_ndc("http://id.ndl.go.jp/auth/ndlsh/001"), None);
    }

    #[test]
    fn undotted_subject_is_skipped_for_a_later_dotted_one() {
        let xml = envelope(
            1,
            &record(
                r#"<dcterms:title>坊っちゃん</dcterms:title>
        <dcterms:subject rdf:resource="http://id.ndl.go.jp/class/ndc9/913"/>
        <dcterms:subject rdf:resource="http://id.ndl.go.jp/class/ndc9/913.6"/>"#,
            ),
        );

        let book = parse_search_response(&xml, "9784101010038").unwrap();
        assert_eq!(book.ndc, "913.6");
    }
}
