//! Pre-tokenization: text cleanup, whitespace and punctuation splitting
//!
//! Mirrors BERT's basic tokenizer closely enough that vocabularies trained
//! with it segment the same way on ordinary text.
//!
//! Accent stripping removes combining marks and folds the precomposed Latin-1
//! and Latin Extended-A letters. Other precomposed letters (Vietnamese, Latin
//! Extended Additional) keep their accents, unlike BERT's full NFD pass.
//! Letters with no decomposition (`ł`, `ø`, `đ`) are left alone by both.

/// Split `text` into words and punctuation marks
pub fn basic_tokenize(text: &str, lowercase: bool) -> Vec<String> {
    let cleaned = clean_text(text);
    let spaced = pad_cjk(&cleaned);

    let mut words = Vec::new();
    for token in spaced.split_whitespace() {
        let token = if lowercase { strip_accents(&token.to_lowercase()) } else { token.to_string() };
        split_on_punctuation(&token, &mut words);
    }
    words
}

/// Drop NUL, U+FFFD and control characters; map all whitespace to a space
fn clean_text(text: &str) -> String {
    text.chars()
        .filter(|&c| c != '\0' && c != '\u{FFFD}' && !is_control(c))
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .collect()
}

fn is_control(c: char) -> bool {
    !matches!(c, '\t' | '\n' | '\r') && c.is_control()
}

/// Surround CJK ideographs with spaces so each becomes its own word
fn pad_cjk(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if is_cjk(c) {
            out.push(' ');
            out.push(c);
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x4E00..=0x9FFF
            | 0x3400..=0x4DBF
            | 0x20000..=0x2A6DF
            | 0x2A700..=0x2B73F
            | 0x2B740..=0x2B81F
            | 0x2B820..=0x2CEAF
            | 0xF900..=0xFAFF
            | 0x2F800..=0x2FA1F
    )
}

/// Punctuation: every non-alphanumeric printable ASCII char, plus the
/// Unicode `P*` characters of the Latin-1, general punctuation, CJK and
/// full-width blocks
fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(
            c as u32,
            0x00A1 | 0x00A7 | 0x00AB | 0x00B6 | 0x00B7 | 0x00BB | 0x00BF
                | 0x2010..=0x2027
                | 0x2030..=0x2043
                | 0x2045..=0x2051
                | 0x2053..=0x205E
                | 0x3001..=0x3003
                | 0x3008..=0x3011
                | 0x3014..=0x301F
                | 0x3030
                | 0x303D
                | 0xFF01..=0xFF03
                | 0xFF05..=0xFF0A
                | 0xFF0C..=0xFF0F
                | 0xFF1A
                | 0xFF1B
                | 0xFF1F
                | 0xFF20
                | 0xFF3B..=0xFF3D
                | 0xFF3F
                | 0xFF5B
                | 0xFF5D
                | 0xFF5F..=0xFF65
        )
}

fn split_on_punctuation(token: &str, out: &mut Vec<String>) {
    let mut current = String::new();
    for c in token.chars() {
        if is_punctuation(c) {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            out.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
}

/// Remove combining marks and fold precomposed Latin letters to their base
fn strip_accents(text: &str) -> String {
    text.chars()
        .filter(|&c| !matches!(c as u32, 0x0300..=0x036F))
        .map(fold_latin)
        .collect()
}

fn fold_latin(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' => 'd',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' => 'i',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' => 't',
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}
