/// Single-line excerpt of `s` for log fields: whitespace runs collapse to
/// one space and anything past `max_chars` is replaced by `...`.
#[must_use]
pub fn preview(s: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(s.len().min(max_chars + 3));
    let mut taken = 0;
    for word in s.split_whitespace() {
        if taken > 0 {
            if taken == max_chars {
                out.push_str("...");
                return out;
            }
            out.push(' ');
            taken += 1;
        }
        for ch in word.chars() {
            if taken == max_chars {
                out.push_str("...");
                return out;
            }
            out.push(ch);
            taken += 1;
        }
    }
    out
}
