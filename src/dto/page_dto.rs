use serde::Deserialize;

const MAX_LIMIT: i64 = 100;

/// `?skip=&limit=` query parameters.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Page {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64
}

fn default_limit() -> i64 {
    MAX_LIMIT
}

impl Page {
    pub fn offset(&self) -> i64 {
        self.skip.max(0)
    }

    pub fn limit(&self) -> i64 {
        self.limit.clamp(0, MAX_LIMIT)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self { skip: 0, limit: MAX_LIMIT }
    }
}

#[cfg(test)]
mod tests {
    use super::Page;

    #[test]
    fn negative_and_oversized_values_are_clamped() {
        let page = Page { skip: -4, limit: 5_000 };
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), 100);
    }
}
