//! Key names accepted in the `[hotkeys]` config section

use rdev::Key;

/// Parse a case-insensitive key name such as `p`, `space` or `F9`
pub fn parse_key(name: &str) -> Option<Key> {
    let name = name.trim().to_lowercase();

    if name.chars().count() == 1 {
        return name.chars().next().and_then(single_char_key);
    }

    let key = match name.as_str() {
        "space" => Key::Space,
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "insert" | "ins" => Key::Insert,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" | "page up" => Key::PageUp,
        "pagedown" | "page down" => Key::PageDown,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "pause" => Key::Pause,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        _ => return None,
    };
    Some(key)
}

fn single_char_key(c: char) -> Option<Key> {
    let key = match c {
        'a' => Key::KeyA,
        'b' => Key::KeyB,
        'c' => Key::KeyC,
        'd' => Key::KeyD,
        'e' => Key::KeyE,
        'f' => Key::KeyF,
        'g' => Key::KeyG,
        'h' => Key::KeyH,
        'i' => Key::KeyI,
        'j' => Key::KeyJ,
        'k' => Key::KeyK,
        'l' => Key::KeyL,
        'm' => Key::KeyM,
        'n' => Key::KeyN,
        'o' => Key::KeyO,
        'p' => Key::KeyP,
        'q' => Key::KeyQ,
        'r' => Key::KeyR,
        's' => Key::KeyS,
        't' => Key::KeyT,
        'u' => Key::KeyU,
        'v' => Key::KeyV,
        'w' => Key::KeyW,
        'x' => Key::KeyX,
        'y' => Key::KeyY,
        'z' => Key::KeyZ,
        '0' => Key::Num0,
        '1' => Key::Num1,
        '2' => Key::Num2,
        '3' => Key::Num3,
        '4' => Key::Num4,
        '5' => Key::Num5,
        '6' => Key::Num6,
        '7' => Key::Num7,
        '8' => Key::Num8,
        '9' => Key::Num9,
        _ => return None,
    };
    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_letters_and_digits() {
        assert_eq!(parse_key("p"), Some(Key::KeyP));
        assert_eq!(parse_key("U"), Some(Key::KeyU));
        assert_eq!(parse_key("7"), Some(Key::Num7));
    }

    #[test]
    fn test_parse_named_keys() {
        assert_eq!(parse_key("space"), Some(Key::Space));
        assert_eq!(parse_key("Enter"), Some(Key::Return));
        assert_eq!(parse_key("F9"), Some(Key::F9));
        assert_eq!(parse_key(" esc "), Some(Key::Escape));
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("hyperspace"), None);
        assert_eq!(parse_key("f13"), None);
    }
}
