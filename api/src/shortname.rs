//! Short-name derivation for customer codes.
//!
//! `"Nguyễn Văn A"` becomes `NVA`: diacritics folded to ASCII, the initial of
//! every word but the last, then the last word in full.

const FOLD_A: &str = "ÀÁẢÃẠĂẰẮẲẴẶÂẦẤẨẪẬ";
const FOLD_E: &str = "ÈÉẺẼẸÊỀẾỂỄỆ";
const FOLD_I: &str = "ÌÍỈĨỊ";
const FOLD_O: &str = "ÒÓỎÕỌÔỒỐỔỖỘƠỜỚỞỠỢ";
const FOLD_U: &str = "ÙÚỦŨỤƯỪỨỬỮỰ";
const FOLD_Y: &str = "ỲÝỶỸỴ";

pub fn derive_short_name(full_name: &str) -> String {
    let words: Vec<String> = full_name
        .split_whitespace()
        .map(fold_word)
        .filter(|w| !w.is_empty())
        .collect();
    let Some((last, initials)) = words.split_last() else {
        return String::new();
    };
    let mut out = String::new();
    for word in initials {
        if let Some(first) = word.chars().next() {
            out.push(first);
        }
    }
    out.push_str(last);
    out
}

fn fold_word(word: &str) -> String {
    word.chars()
        .flat_map(char::to_uppercase)
        .map(fold_char)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn fold_char(c: char) -> char {
    if FOLD_A.contains(c) {
        'A'
    } else if FOLD_E.contains(c) {
        'E'
    } else if FOLD_I.contains(c) {
        'I'
    } else if FOLD_O.contains(c) {
        'O'
    } else if FOLD_U.contains(c) {
        'U'
    } else if FOLD_Y.contains(c) {
        'Y'
    } else if c == 'Đ' {
        'D'
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::derive_short_name;

    #[test]
    fn initials_plus_surname() {
        assert_eq!(derive_short_name("Nguyen Van A"), "NVA");
        assert_eq!(derive_short_name("Tran Thi Thu Huong"), "TTTHUONG");
    }

    #[test]
    fn folds_vietnamese_diacritics() {
        assert_eq!(derive_short_name("Nguyễn Văn Đức"), "NVDUC");
        assert_eq!(derive_short_name("Công ty Hoà Bình"), "CTHBINH");
    }

    #[test]
    fn single_word_is_kept_whole() {
        assert_eq!(derive_short_name("ACME"), "ACME");
        assert_eq!(derive_short_name("  acme  "), "ACME");
    }

    #[test]
    fn drops_punctuation_and_empty_input() {
        assert_eq!(derive_short_name("Công ty TNHH A.B.C"), "CTTABC");
        assert_eq!(derive_short_name("   "), "");
        assert_eq!(derive_short_name("!!!"), "");
    }
}
