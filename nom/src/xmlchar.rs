use nom::bytes::complete::take_while;
use nom::character::complete::satisfy;
use nom::combinator::recognize;
use nom::sequence::pair;
use nom::IResult;

/// [\[4\] NameStartChar](https://www.w3.org/TR/xml/#NT-NameStartChar)
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':'
        | 'A'..='Z'
        | '_'
        | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// [\[4a\] NameChar](https://www.w3.org/TR/xml/#NT-NameChar)
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-'
            | '.'
            | '0'..='9'
            | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

/// NameStartChar NameChar* without any of `except`.
pub fn name_except<'a>(except: &'a str) -> impl FnMut(&'a str) -> IResult<&'a str, &'a str> {
    move |input: &'a str| {
        recognize(pair(
            satisfy(|c| is_name_start_char(c) && !except.contains(c)),
            take_while(|c| is_name_char(c) && !except.contains(c)),
        ))(input)
    }
}

// -----------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_char_class() {
        assert!(is_name_start_char('a'));
        assert!(is_name_start_char('_'));
        assert!(!is_name_start_char('-'));
        assert!(!is_name_start_char('1'));
        assert!(is_name_char('-'));
        assert!(is_name_char('1'));
        assert!(!is_name_char(' '));
    }

    #[test]
    fn test_name_except() {
        let (rest, ret) = name_except(":")("a-b:c").unwrap();
        assert_eq!(":c", rest);
        assert_eq!("a-b", ret);

        let (rest, ret) = name_except("")("a:b c").unwrap();
        assert_eq!(" c", rest);
        assert_eq!("a:b", ret);

        assert!(name_except(":")("1a").is_err());
        assert!(name_except(":")(":a").is_err());
    }
}
