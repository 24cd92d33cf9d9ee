//! PII masking for user-facing responses
//!
//! All functions operate on characters, not bytes, so multi-byte names are
//! never split.

/// `alice.smith@example.com` → `al***h@example.com`.
/// Local parts of three characters or fewer are returned unchanged.
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email.to_string();
    };
    let chars: Vec<char> = local.chars().collect();
    if chars.len() <= 3 {
        return email.to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail = chars[chars.len() - 1];
    format!("{}***{}@{}", head, tail, domain)
}

/// `13812345678` → `138****5678`; anything not 11 characters is unchanged.
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() != 11 {
        return phone.to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[7..].iter().collect();
    format!("{}****{}", head, tail)
}

/// `张三丰` → `张**丰`; two characters or fewer are unchanged.
pub fn mask_real_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() <= 2 {
        return name.to_string();
    }
    format!("{}**{}", chars[0], chars[chars.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("alice@example.com"), "al***e@example.com");
        assert_eq!(mask_email("bob@example.com"), "bob@example.com");
        assert_eq!(mask_email("not-an-email"), "not-an-email");
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("13812345678"), "138****5678");
        assert_eq!(mask_phone("12345"), "12345");
        assert_eq!(mask_phone(""), "");
    }

    #[test]
    fn test_mask_real_name_is_char_based() {
        assert_eq!(mask_real_name("张三丰"), "张**丰");
        assert_eq!(mask_real_name("张三"), "张三");
        assert_eq!(mask_real_name("Bob"), "B**b");
        assert_eq!(mask_real_name(""), "");
    }
}
