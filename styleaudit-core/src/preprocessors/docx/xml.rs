//! Small helpers shared by the WordprocessingML readers.

use quick_xml::events::BytesStart;

/// Value of the first attribute with the given local name (prefix ignored)
pub fn attr_val(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// ST_OnOff: a missing `w:val` means on
pub fn on_off(val: Option<&str>) -> bool {
    !matches!(val, Some("0") | Some("false") | Some("off") | Some("none"))
}

/// ST_Underline: everything except "none" draws a line
pub fn underline_on(val: Option<&str>) -> bool {
    !matches!(val, Some("none"))
}

/// Tracked-change containers: they hold the formatting before the revision
pub fn is_revision_record(local: &[u8]) -> bool {
    matches!(
        local,
        b"rPrChange" | b"pPrChange" | b"sectPrChange" | b"tblPrChange" | b"trPrChange" | b"tcPrChange"
    )
}

/// `w:outlineLvl` is 0-based; 9 means body text
pub fn heading_from_outline(level: u32) -> Option<u32> {
    (level < 9).then_some(level + 1)
}
