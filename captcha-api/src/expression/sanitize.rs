/// Drop everything from the first `=` and keep only digits, `+ - * /` and
/// parentheses.
pub fn sanitize(text: &str) -> String {
    let head = text.split('=').next().unwrap_or_default();
    head.chars().filter(|c| is_allowed(*c)).collect()
}

fn is_allowed(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("12+7=?"), "12+7");
        assert_eq!(sanitize("3 × 4 = "), "34");
        assert_eq!(sanitize("(1.5+2)*x"), "(15+2)*");
        assert_eq!(sanitize("a=b=c"), "");
        assert_eq!(sanitize("１２+3"), "+3");
        assert_eq!(sanitize(""), "");
    }
}
