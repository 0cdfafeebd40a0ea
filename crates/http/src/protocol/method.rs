use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::protocol::ParseError;

/// The request methods this server understands.
///
/// Anything else on the request line is rejected with [`ParseError::InvalidMethod`]
/// rather than mapped onto a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl FromStr for Method {
    type Err = ParseError;

    fn from_str(str: &str) -> Result<Self, Self::Err> {
        match str {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(ParseError::invalid_method(other)),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from() {
        assert_eq!("GET".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("OPTIONS".parse::<Method>().unwrap(), Method::Options);
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_method_from_error() {
        {
            let result = "get".parse::<Method>();
            assert!(matches!(result, Err(ParseError::InvalidMethod { .. })));
        }

        {
            let result = "PATCH".parse::<Method>();
            assert!(matches!(result, Err(ParseError::InvalidMethod { .. })));
        }

        {
            let result = "".parse::<Method>();
            assert!(matches!(result, Err(ParseError::InvalidMethod { .. })));
        }
    }
}
