/// Оставляет в строке только буквы, цифры и пробельные символы.
///
/// Используется для имён каталогов и названий треков, пришедших извне.
/// Остальные символы просто отбрасываются (без замены), порядок сохраняется.
/// Функция идемпотентна: `sanitize_name(&sanitize_name(x)) == sanitize_name(x)`.
///
/// Пустой результат означает, что из входа нельзя построить путь;
/// вызывающий код должен считать это ошибкой.
///
/// # Example
///
/// ```
/// use likesync::core::utils::sanitize_name;
///
/// assert_eq!(sanitize_name("Song! (Live) #1"), "Song Live 1");
/// assert_eq!(sanitize_name("../../etc"), "etc");
/// ```
pub fn sanitize_name(raw: &str) -> String {
    raw.chars().filter(|c| c.is_alphanumeric() || c.is_whitespace()).collect()
}

/// Имя файла трека: `"{stem}.{extension}"`.
///
/// Возвращает `None`, если после очистки название оказалось пустым.
pub fn track_file_name(title: &str, extension: &str) -> Option<String> {
    let stem = sanitize_name(title);
    if stem.is_empty() {
        None
    } else {
        Some(format!("{}.{}", stem, extension))
    }
}

#[cfg(test)]
mod tests {
    use super::{sanitize_name, track_file_name};

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Song! (Live) #1"), "Song Live 1");
        assert_eq!(sanitize_name("tracks"), "tracks");
        assert_eq!(sanitize_name("a/b\\c:d*e?f"), "abcdef");
        assert_eq!(sanitize_name("../secret"), "secret");

        // Кириллица сохраняется
        assert_eq!(sanitize_name("Дорадура — трек"), "Дорадура  трек");

        // Пустой результат
        assert_eq!(sanitize_name(""), "");
        assert_eq!(sanitize_name("!!!..///"), "");
    }

    #[test]
    fn test_sanitize_name_idempotent() {
        let inputs = ["Song! (Live) #1", "  spaced\tout  ", "..", "Ünïcödé 123", "a.b.c"];
        for input in inputs {
            let once = sanitize_name(input);
            assert_eq!(sanitize_name(&once), once, "not idempotent for {:?}", input);
            assert!(once.chars().all(|c| c.is_alphanumeric() || c.is_whitespace()));
        }
    }

    #[test]
    fn test_track_file_name() {
        assert_eq!(track_file_name("Title", "mp3").as_deref(), Some("Title.mp3"));
        assert_eq!(track_file_name("Don't Stop", "aac").as_deref(), Some("Dont Stop.aac"));
        assert_eq!(track_file_name("?!", "mp3"), None);
    }
}
