//! # Wire Codec
//!
//! Length-prefixed text framing used by the VM hosting service.
//!
//! A frame is `<len>.<field>[,<len>.<field>...];` where `<len>` is the UTF-8
//! byte length of the field. Length prefixing makes field boundaries
//! unambiguous, so fields are never escaped.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Replaced the 4-byte JSON framing with the guacamole text framing

/// Field separator inside a frame
pub const FIELD_SEPARATOR: u8 = b',';
/// Frame terminator
pub const FRAME_TERMINATOR: u8 = b';';
/// Separator between a length prefix and its field
pub const LENGTH_SEPARATOR: u8 = b'.';

/// Encode fields into a single frame
pub fn encode<S: AsRef<str>>(fields: &[S]) -> String {
    let capacity = fields.iter().map(|f| f.as_ref().len() + 8).sum::<usize>() + 1;
    let mut frame = String::with_capacity(capacity);

    for (i, field) in fields.iter().enumerate() {
        let field = field.as_ref();
        if i > 0 {
            frame.push(FIELD_SEPARATOR as char);
        }
        frame.push_str(&field.len().to_string());
        frame.push(LENGTH_SEPARATOR as char);
        frame.push_str(field);
    }

    frame.push(FRAME_TERMINATOR as char);
    frame
}

/// Decode a raw frame into its fields
///
/// Decoding is total: a malformed length prefix, a truncated field, or a
/// missing terminator stops parsing and returns the fields read so far.
pub fn decode(raw: &str) -> Vec<String> {
    let bytes = raw.as_bytes();
    let mut fields = Vec::new();
    let mut pos = 0;

    loop {
        match bytes.get(pos) {
            None => return fields,
            Some(&FRAME_TERMINATOR) => return fields,
            Some(_) => {}
        }

        let Some(dot) = bytes[pos..].iter().position(|&b| b == LENGTH_SEPARATOR) else {
            return fields;
        };
        let prefix = &bytes[pos..pos + dot];
        if prefix.is_empty() || !prefix.iter().all(u8::is_ascii_digit) {
            return fields;
        }
        // Prefix is all ASCII digits, so it is valid UTF-8.
        let Ok(len) = std::str::from_utf8(prefix).unwrap_or_default().parse::<usize>() else {
            return fields;
        };

        let start = pos + dot + 1;
        let Some(end) = start.checked_add(len) else {
            return fields;
        };
        let Some(value) = raw.get(start..end) else {
            return fields;
        };
        fields.push(value.to_string());

        match bytes.get(end) {
            Some(&FIELD_SEPARATOR) => pos = end + 1,
            _ => return fields,
        }
    }
}
