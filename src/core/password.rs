/// Characters accepted as "special" by the account service UI.
const SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Password strength rules, checked in fixed order; the first violated
/// rule wins. Returns None when the candidate passes all six. Both
/// self-registration and admin user creation go through this one
/// function so the two flows can never drift apart.
pub fn validate_password(candidate: &str) -> Option<&'static str> {
    let len = candidate.chars().count();
    if len < 8 {
        return Some("Password must be at least 8 characters long");
    }
    if len > 16 {
        return Some("Password must not exceed 16 characters");
    }
    if !candidate.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("Password must contain at least one uppercase letter");
    }
    if !candidate.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("Password must contain at least one lowercase letter");
    }
    if !candidate.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must contain at least one number");
    }
    if !candidate.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Some("Password must contain at least one special character");
    }
    None
}
