//! Dropdown value lists

/// Sorted, de-duplicated, non-empty values
pub fn distinct_sorted<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut values: Vec<String> = values
        .into_iter()
        .filter(|value| !value.trim().is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_and_dedups() {
        let values = vec!["QS-2".to_string(), String::new(), "QS-1".to_string(), "QS-2".to_string()];
        assert_eq!(distinct_sorted(values), vec!["QS-1", "QS-2"]);
    }
}
