//! Formatting helpers shared across crates.

use std::fmt;

/// Display a slice of items with a configurable delimiter and brackets.
#[derive(Debug)]
pub struct DisplayableSlice<'a, T> {
    left_delim: &'static str,
    right_delim: &'static str,
    separator: &'static str,
    slice: &'a [T],
}

impl<'a, T: fmt::Display> fmt::Display for DisplayableSlice<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.left_delim)?;
        for (idx, item) in self.slice.iter().enumerate() {
            if idx > 0 {
                write!(f, "{}", self.separator)?;
            }
            write!(f, "{item}")?;
        }
        write!(f, "{}", self.right_delim)
    }
}

pub trait IntoDisplayableSlice<T> {
    /// Display as `[a, b, c]`.
    fn display_with_brackets(&self) -> DisplayableSlice<T>;

    /// Display as `{a, b, c}`.
    fn display_as_set(&self) -> DisplayableSlice<T>;

    /// Display as `a, b, c` without any surrounding delimiters.
    fn display_as_list(&self) -> DisplayableSlice<T>;

    /// Display items joined with a custom separator, e.g. `a OR b`.
    fn display_joined(&self, separator: &'static str) -> DisplayableSlice<T>;
}

impl<T: fmt::Display, S: AsRef<[T]>> IntoDisplayableSlice<T> for S {
    fn display_with_brackets(&self) -> DisplayableSlice<T> {
        DisplayableSlice {
            left_delim: "[",
            right_delim: "]",
            separator: ", ",
            slice: self.as_ref(),
        }
    }

    fn display_as_set(&self) -> DisplayableSlice<T> {
        DisplayableSlice {
            left_delim: "{",
            right_delim: "}",
            separator: ", ",
            slice: self.as_ref(),
        }
    }

    fn display_as_list(&self) -> DisplayableSlice<T> {
        DisplayableSlice {
            left_delim: "",
            right_delim: "",
            separator: ", ",
            slice: self.as_ref(),
        }
    }

    fn display_joined(&self, separator: &'static str) -> DisplayableSlice<T> {
        DisplayableSlice {
            left_delim: "",
            right_delim: "",
            separator,
            slice: self.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets() {
        let v = vec![1, 2, 3];
        assert_eq!("[1, 2, 3]", v.display_with_brackets().to_string());
    }

    #[test]
    fn set_empty() {
        let v: Vec<usize> = Vec::new();
        assert_eq!("{}", v.display_as_set().to_string());
    }

    #[test]
    fn joined() {
        let v = ["a", "b"];
        assert_eq!("a OR b", v.display_joined(" OR ").to_string());
    }
}
