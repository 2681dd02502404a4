//! Delivery verification codes and tracking numbers

use rand::Rng;

/// Tracking number prefix
const TRACKING_PREFIX: &str = "DLG";

/// Characters used for the random tracking suffix
const SUFFIX_CHARSET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a random 6-digit OTP in `100000..=999999`
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

/// Verify a presented OTP against the stored one
pub fn verify_otp(input: &str, saved: &str) -> bool {
    !saved.is_empty() && input == saved
}

/// Generate a tracking number: fixed prefix + base-36 timestamp + 5
/// random uppercase alphanumerics, all uppercase
pub fn generate_tracking_number() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..5)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    format!("{}{}{}", TRACKING_PREFIX, to_base36_upper(millis), suffix)
}

fn to_base36_upper(mut value: i64) -> String {
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value <= 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn otp_is_six_digits_in_range() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let n: u32 = otp.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn otp_verification() {
        assert!(verify_otp("123456", "123456"));
        assert!(!verify_otp("123456", "654321"));
        // An unset stored code never verifies
        assert!(!verify_otp("", ""));
    }

    #[test]
    fn tracking_number_shape() {
        let tn = generate_tracking_number();
        assert!(tn.starts_with("DLG"));
        assert_eq!(tn, tn.to_uppercase());
        // prefix + at least 8 base36 digits + 5 char suffix
        assert!(tn.len() > 3 + 5);
        assert!(
            tn.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()),
            "unexpected characters in {}",
            tn
        );
    }

    #[test]
    fn base36_round_trip() {
        assert_eq!(to_base36_upper(0), "0");
        assert_eq!(to_base36_upper(35), "Z");
        assert_eq!(to_base36_upper(36), "10");
        let encoded = to_base36_upper(1_700_000_000_000);
        let decoded = i64::from_str_radix(&encoded, 36).unwrap();
        assert_eq!(decoded, 1_700_000_000_000);
    }
}
