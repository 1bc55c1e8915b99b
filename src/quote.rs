//! POSIX shell quoting.
//!
//! Words made only of safe characters are left alone. Everything else is wrapped in single quotes,
//! with embedded single quotes written as `'\''`. Inside single quotes a POSIX shell performs no
//! expansion at all, so the quoted text is read back verbatim.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

use camino::Utf8Path;
use camino::Utf8PathBuf;

use crate::Error;

/// A value which can be spliced into a shell command line: text or a path.
pub trait ShellArg {
    /// Get this value as text, if it's representable as UTF-8.
    fn as_shell_text(&self) -> Option<Cow<'_, str>>;
}

impl ShellArg for str {
    fn as_shell_text(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self))
    }
}

impl ShellArg for String {
    fn as_shell_text(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self))
    }
}

impl ShellArg for Utf8Path {
    fn as_shell_text(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_str()))
    }
}

impl ShellArg for Utf8PathBuf {
    fn as_shell_text(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.as_str()))
    }
}

impl ShellArg for Path {
    fn as_shell_text(&self) -> Option<Cow<'_, str>> {
        self.to_str().map(Cow::Borrowed)
    }
}

impl ShellArg for PathBuf {
    fn as_shell_text(&self) -> Option<Cow<'_, str>> {
        self.as_path().as_shell_text()
    }
}

impl ShellArg for OsStr {
    fn as_shell_text(&self) -> Option<Cow<'_, str>> {
        self.to_str().map(Cow::Borrowed)
    }
}

impl ShellArg for OsString {
    fn as_shell_text(&self) -> Option<Cow<'_, str>> {
        self.as_os_str().as_shell_text()
    }
}

impl<T: ShellArg + ?Sized> ShellArg for &T {
    fn as_shell_text(&self) -> Option<Cow<'_, str>> {
        (**self).as_shell_text()
    }
}

/// Quote a value so that it can be spliced into a shell command line verbatim.
///
/// Fails with [`Error::InvalidArgumentType`] if the value isn't valid UTF-8.
pub fn quote<T: ShellArg + ?Sized>(value: &T) -> crate::Result<String> {
    match value.as_shell_text() {
        Some(text) => Ok(quote_str(&text)),
        None => Err(Error::InvalidArgumentType {
            type_name: std::any::type_name::<T>(),
        }),
    }
}

/// Quote each argument and join them with single spaces.
pub fn join_arguments<I>(args: I) -> crate::Result<String>
where
    I: IntoIterator,
    I::Item: ShellArg,
{
    let quoted = args
        .into_iter()
        .map(|arg| quote(&arg))
        .collect::<crate::Result<Vec<_>>>()?;
    Ok(quoted.join(" "))
}

/// Quote a string which is already known to be text. Infallible.
pub(crate) fn quote_str(text: &str) -> String {
    if !text.is_empty() && text.chars().all(is_safe) {
        return text.to_owned();
    }

    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        if c == '\'' {
            quoted.push_str(r"'\''");
        } else {
            quoted.push(c);
        }
    }
    quoted.push('\'');
    quoted
}

/// Characters which never need quoting.
fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '@' | '%' | '+' | '=' | ':' | ',' | '.' | '/' | '-' | '_')
}

#[cfg(test)]
mod tests {
    use std::os::unix::ffi::OsStrExt;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_quote_safe_words() {
        assert_eq!(quote("puppy").unwrap(), "puppy");
        assert_eq!(quote("/usr/bin/env").unwrap(), "/usr/bin/env");
        assert_eq!(quote("--user=root").unwrap(), "--user=root");
        assert_eq!(quote(Path::new("src/lib.rs")).unwrap(), "src/lib.rs");
    }

    #[test]
    fn test_quote_special_characters() {
        assert_eq!(quote("").unwrap(), "''");
        assert_eq!(quote("hello world").unwrap(), "'hello world'");
        assert_eq!(quote("$HOME").unwrap(), "'$HOME'");
        assert_eq!(quote("it's").unwrap(), r"'it'\''s'");
        assert_eq!(quote("a; rm -rf /").unwrap(), "'a; rm -rf /'");
        assert_eq!(
            quote(&Utf8PathBuf::from("/tmp/my dir")).unwrap(),
            "'/tmp/my dir'"
        );
    }

    #[test]
    fn test_quote_invalid_utf8() {
        let path = Path::new(OsStr::from_bytes(b"caf\xe9"));
        assert!(matches!(
            quote(path),
            Err(Error::InvalidArgumentType { .. })
        ));
    }

    #[test]
    fn test_join_arguments() {
        assert_eq!(
            join_arguments(["echo", "hello world", "it's"]).unwrap(),
            r"echo 'hello world' 'it'\''s'"
        );
        assert_eq!(join_arguments(Vec::<String>::new()).unwrap(), "");
        assert_eq!(
            join_arguments([PathBuf::from("ls"), PathBuf::from("a b")]).unwrap(),
            "ls 'a b'"
        );
    }

    /// Quoted values survive a round trip through a POSIX shell word splitter.
    #[test]
    fn test_quote_round_trip() {
        let values = [
            "",
            "plain",
            "two words",
            "single ' quote",
            "double \" quote",
            "back\\slash",
            "$(dangerous) `command` ${substitution}",
            "new\nline",
            "tab\there",
            "glob * ? [x]",
            "'''",
            "{a,b}",
            "~root",
            "#comment",
        ];
        for value in values {
            let quoted = quote(value).unwrap();
            assert_eq!(shell_words::split(&quoted).unwrap(), vec![value.to_owned()]);
        }
    }
}
