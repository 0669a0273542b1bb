use base64::Engine as _;
use base64::alphabet;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use designmail_core::DesignId;

/// Content type assumed when the payload carries no data-URL prefix.
const DEFAULT_CONTENT_TYPE: &str = "image/png";

/// Standard alphabet, padding and trailing bits ignored.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    NO_PAD
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// A stored design record, created by the upstream submission flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    pub design_id: DesignId,
    /// Encoded image, normally a `data:image/png;base64,...` URL.
    pub design: String,
    /// Template the customer started from.
    pub template: String,
    pub created_at: DateTime<Utc>,
}

/// Decoded design image, ready to attach to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignImage {
    pub design_id: DesignId,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Design {
    pub fn new(design_id: DesignId, design: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            design_id,
            design: design.into(),
            template: template.into(),
            created_at: Utc::now(),
        }
    }

    /// Strip the data-URL marker and decode the base64 image.
    ///
    /// Any `data:<mime>[;base64],` prefix is accepted; a payload without a
    /// prefix is decoded as raw base64 and assumed to be PNG. Decoding is
    /// lenient: characters outside the base64 alphabet are skipped, input stops
    /// at the first `=`, and a dangling final symbol is dropped. The result may
    /// be empty.
    pub fn decode_image(&self) -> DesignImage {
        let (content_type, encoded) = split_data_url(&self.design);

        DesignImage {
            design_id: self.design_id.clone(),
            content_type: content_type.to_string(),
            bytes: decode_lenient(encoded),
        }
    }
}

impl DesignImage {
    /// Attachment filename, `design-<id>.<ext>`.
    ///
    /// Characters outside `[A-Za-z0-9_-]` in the identifier are replaced so the
    /// name is safe in a MIME header.
    pub fn filename(&self) -> String {
        let stem: String = self
            .design_id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("design-{}.{}", stem, self.extension())
    }

    fn extension(&self) -> &str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "png",
        }
    }
}

fn split_data_url(payload: &str) -> (&str, &str) {
    let Some((meta, data)) = payload
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
    else {
        return (DEFAULT_CONTENT_TYPE, payload);
    };

    let mime = meta.split(';').next().unwrap_or_default().trim();
    let mime = if mime.is_empty() { DEFAULT_CONTENT_TYPE } else { mime };
    (mime, data)
}

fn decode_lenient(encoded: &str) -> Vec<u8> {
    let mut symbols: String = encoded
        .chars()
        .take_while(|&c| c != '=')
        .filter_map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '+' | '/' => Some(c),
            '-' => Some('+'),
            '_' => Some('/'),
            _ => None,
        })
        .collect();

    if symbols.len() % 4 == 1 {
        symbols.pop();
    }

    PAYLOAD_ENGINE.decode(symbols.as_bytes()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG.
    const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    fn design(payload: &str) -> Design {
        Design::new(DesignId::new("abc123").unwrap(), payload, "tmpl-mug")
    }

    #[test]
    fn strips_png_data_url_prefix() {
        let image = design(&format!("data:image/png;base64,{PNG_B64}")).decode_image();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(&image.bytes[1..4], b"PNG");
        assert_eq!(image.filename(), "design-abc123.png");
    }

    #[test]
    fn accepts_raw_base64_without_prefix() {
        let image = design(PNG_B64).decode_image();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(&image.bytes[1..4], b"PNG");
    }

    #[test]
    fn tolerates_whitespace_and_missing_padding() {
        let full = design(PNG_B64).decode_image();
        let unpadded = PNG_B64.trim_end_matches('=');
        let wrapped = format!("data:image/png;base64,{}\n{}", &unpadded[..20], &unpadded[20..]);
        assert_eq!(design(&wrapped).decode_image().bytes, full.bytes);
    }

    #[test]
    fn keeps_declared_content_type() {
        let image = design(&format!("data:image/jpeg;base64,{PNG_B64}")).decode_image();
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!(image.filename(), "design-abc123.jpg");
    }

    #[test]
    fn empty_payload_decodes_to_no_bytes() {
        let image = design("data:image/png;base64,").decode_image();
        assert!(image.bytes.is_empty());
        assert_eq!(image.content_type, "image/png");
    }

    #[test]
    fn skips_characters_outside_the_alphabet() {
        assert!(design("data:image/png;base64,@@@@").decode_image().bytes.is_empty());
        // "aGk=" is "hi"
        assert_eq!(design("data:image/png;base64,a!G*k=").decode_image().bytes, b"hi");
    }

    #[test]
    fn stops_at_first_padding_and_drops_dangling_symbol() {
        assert_eq!(design("aGk=aGk=").decode_image().bytes, b"hi");
        assert_eq!(design("aGkx").decode_image().bytes, b"hi1");
        assert_eq!(design("aGkxZ").decode_image().bytes, b"hi1");
    }

    #[test]
    fn accepts_url_safe_symbols() {
        // 0xfb 0xff encodes as "+/8" in the standard alphabet
        assert_eq!(design("-_8").decode_image().bytes, vec![0xfb, 0xff]);
    }

    #[test]
    fn non_base64_data_url_keeps_its_media_type() {
        let image = design("data:image/svg+xml,PHN2Zz4").decode_image();
        assert_eq!(image.content_type, "image/svg+xml");
        assert_eq!(image.bytes, b"<svg>");
    }

    #[test]
    fn filename_sanitizes_identifier() {
        let image = DesignImage {
            design_id: DesignId::new("../etc/pass wd").unwrap(),
            content_type: "image/png".to_string(),
            bytes: vec![1],
        };
        assert_eq!(image.filename(), "design-___etc_pass_wd.png");
    }
}
