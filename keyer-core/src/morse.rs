//! International Morse code table
//!
//! Patterns use `.` for dit and `-` for dah. Lookup works both ways; a
//! character that is not in the table encodes to the empty pattern.

/// Character to pattern mapping, upper-case only
pub static MORSE_TABLE: &[(char, &str)] = &[
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('0', "-----"),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('!', "-.-.--"),
    ('"', ".-..-."),
    ('$', "...-..-"),
    ('&', ".-..."),
    ('\'', ".----."),
    ('(', "-.--."),
    (')', "-.--.-"),
    ('+', ".-.-."),
    (',', "--..--"),
    ('-', "-....-"),
    ('.', ".-.-.-"),
    ('/', "-..-."),
    (':', "---..."),
    (';', "-.-.-."),
    ('=', "-...-"),
    ('?', "..--.."),
    ('@', ".--.-."),
    ('_', "..--.-"),
    ('^', "..--."),
    // Prosign SK (end of contact)
    ('<', "...-.-"),
    ('Ä', ".-.-"),
    ('Á', ".--.-"),
    ('É', "..-.."),
    ('Ñ', "--.--"),
    ('Ö', "---."),
    ('Ü', "..--"),
];

/// Pattern for a character, or `""` when the character has no Morse form.
///
/// Lookup is case-sensitive; callers upper-case first.
pub fn encode(c: char) -> &'static str {
    MORSE_TABLE
        .iter()
        .find(|(ch, _)| *ch == c)
        .map(|(_, pattern)| *pattern)
        .unwrap_or("")
}

/// Character for a pattern, if the pattern is in the table
pub fn decode(pattern: &str) -> Option<char> {
    MORSE_TABLE
        .iter()
        .find(|(_, p)| *p == pattern)
        .map(|(ch, _)| *ch)
}
