use std::fmt;

/// Byte order of the elements inside a tensor buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// The byte order of the platform this binary was compiled for.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    /// Returns true if element bytes must be reversed to move between this
    /// order and `other`.
    pub fn needs_swap(self, other: ByteOrder) -> bool {
        self != other
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LittleEndian => write!(f, "little-endian"),
            ByteOrder::BigEndian => write!(f, "big-endian"),
        }
    }
}

impl std::str::FromStr for ByteOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "little" | "le" | "little-endian" => Ok(ByteOrder::LittleEndian),
            "big" | "be" | "big-endian" => Ok(ByteOrder::BigEndian),
            "native" => Ok(ByteOrder::native()),
            other => Err(format!("unknown byte order '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("le".parse::<ByteOrder>().unwrap(), ByteOrder::LittleEndian);
        assert_eq!("Big".parse::<ByteOrder>().unwrap(), ByteOrder::BigEndian);
        assert_eq!("native".parse::<ByteOrder>().unwrap(), ByteOrder::native());
        assert!("middle".parse::<ByteOrder>().is_err());
    }

    #[test]
    fn test_needs_swap() {
        assert!(ByteOrder::LittleEndian.needs_swap(ByteOrder::BigEndian));
        assert!(!ByteOrder::BigEndian.needs_swap(ByteOrder::BigEndian));
    }
}
