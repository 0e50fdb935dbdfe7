use uuid::Uuid;

/// Parses a row identifier received as text.
///
/// A value that is not a UUID cannot match any row, so callers treat `None`
/// the same as a missing row.
pub(crate) fn parse_row_id(value: &str) -> Option<Uuid> {
    Uuid::parse_str(value.trim()).ok()
}

#[cfg(test)]
mod tests {
    use super::parse_row_id;

    #[test]
    fn non_uuid_values_match_nothing() {
        assert!(parse_row_id("post-1").is_none());
        assert!(parse_row_id(" 67e55044-10b1-426f-9247-bb680e5fe0c8 ").is_some());
    }
}
