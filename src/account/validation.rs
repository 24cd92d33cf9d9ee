//! Input validation for account fields
//!
//! Validated newtypes keep their field private so the only way to obtain one
//! is through `new()`.

use std::fmt;

// ============================================================================
// Validation Errors
// ============================================================================

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Password must contain {0}")]
    WeakPassword(&'static str),
}

fn check_len(field: &'static str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let actual = value.chars().count();
    if actual < min || actual > max {
        return Err(ValidationError::InvalidLength {
            field,
            min,
            max,
            actual,
        });
    }
    Ok(())
}

// ============================================================================
// Username
// ============================================================================

/// 3-20 characters of `[A-Za-z0-9_-]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// # Examples
    /// ```
    /// use cloud_reseller::account::validation::Username;
    ///
    /// assert!(Username::new("alice_01").is_ok());
    /// assert!(Username::new("al").is_err());
    /// assert!(Username::new("alice!").is_err());
    /// ```
    pub fn new(name: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        check_len("username", name, 3, 20)?;
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError::InvalidFormat {
                field: "username",
                value: name.to_string(),
                expected: "letters, digits, underscore or hyphen",
            });
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Email
// ============================================================================

/// `local@domain.tld`, where the TLD is at least two letters
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    pub fn new(email: &str) -> Result<Self, ValidationError> {
        let email = email.trim();
        check_len("email", email, 6, 100)?;
        if !Self::is_well_formed(email) {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                value: email.to_string(),
                expected: "local@domain.tld",
            });
        }
        Ok(Self(email.to_string()))
    }

    fn is_well_formed(email: &str) -> bool {
        let Some((local, domain)) = email.split_once('@') else {
            return false;
        };
        let local_ok = !local.is_empty()
            && local
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
        let Some((host, tld)) = domain.rsplit_once('.') else {
            return false;
        };
        let host_ok = !host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
        let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
        local_ok && host_ok && tld_ok
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Phone
// ============================================================================

/// Mainland mobile number: 11 digits, `1[3-9]xxxxxxxxx`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Phone(String);

impl Phone {
    pub fn new(phone: &str) -> Result<Self, ValidationError> {
        let phone = phone.trim();
        let bytes = phone.as_bytes();
        let ok = bytes.len() == 11
            && bytes.iter().all(u8::is_ascii_digit)
            && bytes[0] == b'1'
            && (b'3'..=b'9').contains(&bytes[1]);
        if !ok {
            return Err(ValidationError::InvalidFormat {
                field: "phone",
                value: phone.to_string(),
                expected: "11-digit mobile number starting with 13-19",
            });
        }
        Ok(Self(phone.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Password
// ============================================================================

/// 8-50 characters with at least one uppercase, one lowercase and one digit
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    check_len("password", password, 8, 50)?;
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ValidationError::WeakPassword("an uppercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ValidationError::WeakPassword("a lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::WeakPassword("a digit"));
    }
    Ok(())
}
