use phonenumber::Mode;

/// Keywords that classify a custom field as phone-like.
///
/// Matched case-insensitively as substrings of the field *name* (not the
/// value). This is the single source of truth for the classification the
/// original client scattered per controller.
pub const PHONE_FIELD_KEYWORDS: [&str; 4] = ["phone", "tel", "mobile", "cell"];

/// Whether a custom-field name denotes a phone number.
pub fn is_phone_field(field_name: &str) -> bool {
    let lowered = field_name.to_lowercase();
    PHONE_FIELD_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

/// Masks a phone value for display, keeping only the last two digits.
///
/// Non-digit formatting characters are preserved so "(555) 123-4567" masks
/// to "(***) ***-**67".
pub fn mask_number(raw: &str) -> String {
    let digit_count = raw.chars().filter(|c| c.is_ascii_digit()).count();
    if digit_count <= 2 {
        return raw.to_string();
    }
    let mut digits_left = digit_count;
    raw.chars()
        .map(|c| {
            if c.is_ascii_digit() {
                digits_left -= 1;
                if digits_left < 2 {
                    c
                } else {
                    '*'
                }
            } else {
                c
            }
        })
        .collect()
}

/// Normalizes a phone value for the click-to-call action.
///
/// Uses phonenumber (port of Google's libphonenumber) when the value parses
/// as an international number, falling back to stripping everything but
/// digits and a leading `+`.
pub fn normalize_number(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('+') {
        if let Ok(number) = phonenumber::parse(None, trimmed) {
            if phonenumber::is_valid(&number) {
                return number.format().mode(Mode::E164).to_string();
            }
        }
    }

    let mut normalized = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            normalized.push(c);
        }
    }
    normalized
}
