//! Project reference numbers: `{license}-{year}-{count:04}`

/// Format a reference number
pub fn reference_number(license_number: &str, year: i32, count: u32) -> String {
    format!("{}-{}-{:04}", license_number, year, count)
}

/// Yields candidate reference numbers for a GLAB, starting after the
/// projects it already created this year
///
/// Storage enforces uniqueness; on a conflict the caller takes the next
/// candidate.
#[derive(Debug, Clone)]
pub struct ReferenceAllocator {
    license_number: String,
    year: i32,
    next_count: u32,
}

impl ReferenceAllocator {
    pub fn new(license_number: impl Into<String>, year: i32, existing_this_year: usize) -> Self {
        Self {
            license_number: license_number.into(),
            year,
            next_count: u32::try_from(existing_this_year)
                .unwrap_or(u32::MAX)
                .saturating_add(1),
        }
    }
}

impl Iterator for ReferenceAllocator {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.next_count == u32::MAX {
            return None;
        }
        let candidate = reference_number(&self.license_number, self.year, self.next_count);
        self.next_count += 1;
        Some(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pads_count() {
        assert_eq!(reference_number("GL-KE-01", 2025, 7), "GL-KE-01-2025-0007");
        assert_eq!(reference_number("X", 2025, 12345), "X-2025-12345");
    }

    #[test]
    fn test_allocator_starts_after_existing() {
        let mut alloc = ReferenceAllocator::new("GL1", 2026, 2);
        assert_eq!(alloc.next().as_deref(), Some("GL1-2026-0003"));
        assert_eq!(alloc.next().as_deref(), Some("GL1-2026-0004"));
    }
}
