// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Downloadable documents for a finished signature.
//!
//! The renderer sits behind a trait so deployments can swap in a richer
//! layout engine; the built-in [`CertificateRenderer`] emits a one-page
//! PDF and an SVG certificate with the same text.

use crate::error::Result;
use crate::models::Signature;

pub const PETITION_TITLE: &str = "CLEAN AIR! MY RIGHT";

const PETITION_BODY: &[&str] = &[
    "To the Hon'ble Chief Justice and the Ministry of Environment,",
    "We, the undersigned, call for urgent protection of the Aravalli range",
    "and enforceable action on air quality for every citizen.",
];

/// A rendered document ready to stream as an attachment.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

impl RenderedDocument {
    /// `attachment; filename=petition_<id>.<ext>`
    pub fn content_disposition(&self, signature_id: &str) -> String {
        format!(
            "attachment; filename=petition_{}.{}",
            signature_id, self.extension
        )
    }
}

/// Renders signatures into downloadable documents.
pub trait SignatureRenderer: Send + Sync {
    fn render_pdf(&self, signature: &Signature) -> Result<RenderedDocument>;
    fn render_image(&self, signature: &Signature) -> Result<RenderedDocument>;
}

/// Plain certificate layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct CertificateRenderer;

impl CertificateRenderer {
    fn lines(signature: &Signature) -> Vec<String> {
        let mut lines = vec![
            format!("Signature #{}", signature.signature_number),
            format!("Date: {}", signature.timestamp.format("%B %d, %Y")),
            String::new(),
        ];
        lines.extend(PETITION_BODY.iter().map(|l| l.to_string()));
        lines.push(String::new());
        lines.push(format!("Signed by: {}", unescape_html(&signature.name)));
        lines.push(format!(
            "Signed at: {}",
            signature.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        lines.push(format!("Reference: {}", signature.id));
        lines
    }
}

impl SignatureRenderer for CertificateRenderer {
    fn render_pdf(&self, signature: &Signature) -> Result<RenderedDocument> {
        let mut content = String::from("BT\n/F2 24 Tf\n72 720 Td\n");
        content.push_str(&format!("({}) Tj\n", pdf_escape(PETITION_TITLE)));
        content.push_str("/F1 12 Tf\n0 -40 Td\n16 TL\n");
        for line in Self::lines(signature) {
            content.push_str(&format!("({}) Tj T*\n", pdf_escape(&line)));
        }
        content.push_str("ET\n");

        Ok(RenderedDocument {
            bytes: build_pdf(&content),
            content_type: "application/pdf",
            extension: "pdf",
        })
    }

    fn render_image(&self, signature: &Signature) -> Result<RenderedDocument> {
        let mut svg = String::from(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1200\" height=\"900\" \
             viewBox=\"0 0 1200 900\" font-family=\"DejaVu Sans, Helvetica, sans-serif\">\n\
             <rect width=\"1200\" height=\"900\" fill=\"#ffffff\"/>\n\
             <rect width=\"1200\" height=\"160\" fill=\"#000000\"/>\n",
        );
        svg.push_str(&format!(
            "<text x=\"600\" y=\"100\" font-size=\"56\" font-weight=\"bold\" fill=\"#ffffff\" \
             text-anchor=\"middle\">{}</text>\n",
            xml_escape(PETITION_TITLE)
        ));

        let mut y = 240;
        for line in Self::lines(signature) {
            if !line.is_empty() {
                svg.push_str(&format!(
                    "<text x=\"60\" y=\"{y}\" font-size=\"26\" fill=\"#222222\">{}</text>\n",
                    xml_escape(&line)
                ));
            }
            y += 44;
        }
        svg.push_str("</svg>\n");

        Ok(RenderedDocument {
            bytes: svg.into_bytes(),
            content_type: "image/svg+xml",
            extension: "svg",
        })
    }
}

/// Assemble a single-page PDF 1.4 around a content stream.
fn build_pdf(content: &str) -> Vec<u8> {
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>"
            .to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold >>".to_string(),
        format!(
            "<< /Length {} >>\nstream\n{}endstream",
            content.len(),
            content
        ),
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}

/// Escape a PDF literal string; non-ASCII becomes `?` for the base-14 fonts.
fn pdf_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Reverse the escaping applied at submission time for display.
fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
