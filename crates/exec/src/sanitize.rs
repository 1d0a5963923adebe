//! Filesystem-safe names for machine addresses and command strings

/// Collapse runs of whitespace, quotes, slashes, colons, and dots into a
/// single underscore. Distinct machine addresses stay distinct in
/// practice (`127.0.0.1:22` and `local` never collide).
#[must_use]
pub fn sanitize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_run = false;
    for ch in value.chars() {
        if ch.is_whitespace() || matches!(ch, '"' | '\'' | '/' | ':' | '.') {
            if !in_run {
                out.push('_');
                in_run = true;
            }
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

/// File name a captured command's output is written to
#[must_use]
pub fn output_file_name(cmd: &str) -> String {
    format!("{}.txt", sanitize(cmd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_special_runs() {
        assert_eq!(sanitize("/bin/echo HELLO"), "_bin_echo_HELLO");
        assert_eq!(sanitize("df -h /"), "df_-h_");
        assert_eq!(sanitize("a  b..c"), "a_b_c");
    }

    #[test]
    fn machine_addresses_stay_distinct() {
        let corpus = ["local", "127.0.0.1:22", "127.0.0.1:2222", "node-1:22"];
        let sanitized: Vec<String> = corpus.iter().map(|a| sanitize(a)).collect();
        for (i, a) in sanitized.iter().enumerate() {
            for (j, b) in sanitized.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "{} and {} collided", corpus[i], corpus[j]);
                }
            }
        }
    }

    #[test]
    fn output_names_carry_txt_extension() {
        assert_eq!(output_file_name("/bin/echo HELLO"), "_bin_echo_HELLO.txt");
    }
}
