use std::path::Path;

pub fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("rcvsim")
        .to_string()
}

/// Converts Excel-style column letters to a 1-based index: A -> 1, Z -> 26, AA -> 27.
pub fn column_letters_to_index(s: &str) -> Option<usize> {
    let mut res: usize = 0;
    for c in s.to_lowercase().chars() {
        if !c.is_ascii_lowercase() {
            return None;
        }
        res = res
            .checked_mul(26)?
            .checked_add(c as usize - 'a' as usize + 1)?;
    }
    if res == 0 {
        None
    } else {
        Some(res)
    }
}

/// Parses a `NAME=VALUE` support adjustment. The name may contain spaces and
/// `=` signs, the value is after the last `=`.
pub fn parse_adjustment(s: &str) -> Option<(String, f64)> {
    let (name, value) = s.rsplit_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = value.trim().parse::<f64>().ok()?;
    Some((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters() {
        assert_eq!(column_letters_to_index("A"), Some(1));
        assert_eq!(column_letters_to_index("z"), Some(26));
        assert_eq!(column_letters_to_index("AB"), Some(28));
        assert_eq!(column_letters_to_index("A1"), None);
        assert_eq!(column_letters_to_index(""), None);
        assert_eq!(column_letters_to_index("ZZZZZZZZZZZZZZZZ"), None);
    }

    #[test]
    fn adjustments() {
        assert_eq!(
            parse_adjustment("Brad Lander=12.5"),
            Some(("Brad Lander".to_string(), 12.5))
        );
        assert_eq!(parse_adjustment(" A = 3 "), Some(("A".to_string(), 3.0)));
        assert_eq!(parse_adjustment("A"), None);
        assert_eq!(parse_adjustment("=3"), None);
        assert_eq!(parse_adjustment("A=x"), None);
    }

    #[test]
    fn file_names() {
        assert_eq!(simplify_file_name("/tmp/data/scenario.json"), "scenario");
    }
}
