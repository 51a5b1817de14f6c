//! The Luhn mod-10 checksum used on order numbers.

/// Returns true if `number` is a non-empty string of ASCII digits whose last digit is a valid Luhn check digit.
pub fn is_valid_luhn(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }
    let mut sum = 0u32;
    for (i, b) in number.bytes().rev().enumerate() {
        if !b.is_ascii_digit() {
            return false;
        }
        let mut digit = u32::from(b - b'0');
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}

/// Appends the Luhn check digit to a string of digits. Returns `None` if `payload` contains anything but digits.
pub fn with_check_digit(payload: &str) -> Option<String> {
    if payload.is_empty() || !payload.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    (0..=9).map(|d| format!("{payload}{d}")).find(|candidate| is_valid_luhn(candidate))
}
