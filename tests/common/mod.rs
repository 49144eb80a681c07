//! Reading back rendered PDFs.

use lopdf::content::Content;
use lopdf::Document;

/// Strings shown on each page, in drawing order.
pub fn page_text(bytes: &[u8]) -> Vec<Vec<String>> {
    let doc = Document::load_mem(bytes).expect("valid PDF");
    doc.get_pages()
        .values()
        .map(|&id| {
            let raw = doc.get_page_content(id).expect("page content");
            let content = Content::decode(&raw).expect("decodable content");
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj" || op.operator == "TJ")
                .map(|op| {
                    let bytes: Vec<u8> = match op.operands[0].as_array() {
                        Ok(parts) => parts
                            .iter()
                            .filter_map(|p| p.as_str().ok())
                            .flatten()
                            .copied()
                            .collect(),
                        Err(_) => op.operands[0].as_str().expect("string operand").to_vec(),
                    };
                    String::from_utf8_lossy(&bytes).into_owned()
                })
                .collect()
        })
        .collect()
}
