//! Flag-set operands for the `$type` and `$regex` operators, so that type
//! aliases and option letters don't have to be spelled as raw strings.

use std::fmt;
use bson::Bson;
use serde::de::{ self, Deserialize, Deserializer, SeqAccess, Visitor };
use serde::ser::{ self, Serialize, Serializer };

bitflags! {
    /// The server-recognized BSON types, for use with the `$type` operator.
    /// A set with more than one flag matches any of its members and is
    /// emitted as an array of type aliases.
    ///
    /// ```
    /// # #[macro_use]
    /// # extern crate bson;
    /// # extern crate mango;
    /// #
    /// # use mango::literal::BsonType;
    /// #
    /// # fn main() {
    /// let single = doc!{ "code": { "$type": BsonType::JAVASCRIPT } };
    /// let numeric = doc!{ "qty": { "$type": BsonType::INT | BsonType::LONG } };
    ///
    /// assert_eq!(single, doc!{ "code": { "$type": "javascript" } });
    /// assert_eq!(numeric, doc!{ "qty": { "$type": ["int", "long"] } });
    /// # }
    /// ```
    pub struct BsonType: u16 {
        /// The `null` value.
        const NULL                  = 0b0000_0000_0000_0001;
        /// `true` or `false`.
        const BOOL                  = 0b0000_0000_0000_0010;
        /// Double-precision floating-point number.
        const DOUBLE                = 0b0000_0000_0000_0100;
        /// 32-bit signed integer.
        const INT                   = 0b0000_0000_0000_1000;
        /// 64-bit signed integer.
        const LONG                  = 0b0000_0000_0001_0000;
        /// 128-bit decimal number.
        const DECIMAL               = 0b0000_0000_0010_0000;
        /// Any of the 4 numeric types (`double`, `int`, `long`, `decimal`).
        const NUMBER                = 0b0000_0000_0011_1100;
        /// `ObjectId`.
        const OBJECT_ID             = 0b0000_0000_0100_0000;
        /// Timestamp.
        const TIMESTAMP             = 0b0000_0000_1000_0000;
        /// Date and time.
        const DATE                  = 0b0000_0001_0000_0000;
        /// String.
        const STRING                = 0b0000_0010_0000_0000;
        /// Regular expression and its matching options.
        const REGEX                 = 0b0000_0100_0000_0000;
        /// Binary data, BLOB.
        const BINARY                = 0b0000_1000_0000_0000;
        /// Array.
        const ARRAY                 = 0b0001_0000_0000_0000;
        /// Document or object.
        const DOCUMENT              = 0b0010_0000_0000_0000;
        /// JavaScript code.
        const JAVASCRIPT            = 0b0100_0000_0000_0000;
        /// JavaScript code with scope.
        const JAVASCRIPT_WITH_SCOPE = 0b1000_0000_0000_0000;
    }
}

impl BsonType {
    /// Flag-to-alias pairs, in emission order. The alias strings are the
    /// server's vocabulary and must be spelled exactly.
    const ALIASES: &'static [(BsonType, &'static str)] = &[
        (BsonType::NULL,                  "null"),
        (BsonType::BOOL,                  "bool"),
        (BsonType::DOUBLE,                "double"),
        (BsonType::INT,                   "int"),
        (BsonType::LONG,                  "long"),
        (BsonType::DECIMAL,               "decimal"),
        (BsonType::OBJECT_ID,             "objectId"),
        (BsonType::TIMESTAMP,             "timestamp"),
        (BsonType::DATE,                  "date"),
        (BsonType::STRING,                "string"),
        (BsonType::REGEX,                 "regex"),
        (BsonType::BINARY,                "binData"),
        (BsonType::ARRAY,                 "array"),
        (BsonType::DOCUMENT,              "object"),
        (BsonType::JAVASCRIPT,            "javascript"),
        (BsonType::JAVASCRIPT_WITH_SCOPE, "javascriptWithScope"),
    ];

    /// The server aliases of every flag in the set, in emission order.
    pub fn aliases(self) -> Vec<&'static str> {
        Self::ALIASES
            .iter()
            .filter(|&&(flag, _)| self.contains(flag))
            .map(|&(_, alias)| alias)
            .collect()
    }

    /// Parses one server type alias into its flag.
    pub fn from_alias(alias: &str) -> Option<Self> {
        Self::ALIASES
            .iter()
            .find(|&&(_, a)| a == alias)
            .map(|&(flag, _)| flag)
    }
}

/// A single flag becomes its alias string, anything larger an alias array.
impl From<BsonType> for Bson {
    fn from(types: BsonType) -> Self {
        let aliases = types.aliases();

        match aliases.len() {
            1 => Bson::String(aliases[0].into()),
            _ => Bson::Array(aliases.into_iter().map(Bson::from).collect()),
        }
    }
}

impl Serialize for BsonType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let aliases = self.aliases();

        match aliases.len() {
            0 => Err(ser::Error::custom("empty `$type` set")),
            1 => serializer.serialize_str(aliases[0]),
            _ => serializer.collect_seq(aliases),
        }
    }
}

impl<'de> Deserialize<'de> for BsonType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        /// Accepts one alias string or an array of them.
        struct AliasVisitor;

        impl<'de> Visitor<'de> for AliasVisitor {
            type Value = BsonType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a BSON type alias or an array of BSON type aliases")
            }

            fn visit_str<E: de::Error>(self, alias: &str) -> Result<BsonType, E> {
                BsonType::from_alias(alias)
                    .ok_or_else(|| E::custom(format!("unknown BSON type alias `{}`", alias)))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<BsonType, A::Error> {
                let mut types = BsonType::empty();

                while let Some(alias) = seq.next_element::<String>()? {
                    types |= BsonType::from_alias(&alias).ok_or_else(|| {
                        de::Error::custom(format!("unknown BSON type alias `{}`", alias))
                    })?;
                }

                Ok(types)
            }
        }

        deserializer.deserialize_any(AliasVisitor)
    }
}

bitflags! {
    /// Matching options of the `$regex` operator, emitted as the server's
    /// option-letter string.
    ///
    /// ```
    /// # use mango::literal::RegexOpts;
    /// #
    /// let options = RegexOpts::IGNORE_CASE | RegexOpts::DOT_NEWLINE;
    /// assert_eq!(options.letters(), "is");
    /// ```
    pub struct RegexOpts: u8 {
        /// Case insensitive matching.
        const IGNORE_CASE = 0b0000_0001;
        /// `^` and `$` match line boundaries, not just the whole string.
        const LINE_ANCHOR = 0b0000_0010;
        /// Extended syntax: ignore embedded whitespace, allow `#`-comments.
        const EXTENDED    = 0b0000_0100;
        /// `.` matches newlines too.
        const DOT_NEWLINE = 0b0000_1000;
    }
}

impl RegexOpts {
    /// Flag-to-letter pairs, in emission order.
    const LETTERS: &'static [(RegexOpts, char)] = &[
        (RegexOpts::IGNORE_CASE, 'i'),
        (RegexOpts::LINE_ANCHOR, 'm'),
        (RegexOpts::EXTENDED,    'x'),
        (RegexOpts::DOT_NEWLINE, 's'),
    ];

    /// The option letters, in the server's `$options` string form.
    pub fn letters(self) -> String {
        Self::LETTERS
            .iter()
            .filter(|&&(option, _)| self.contains(option))
            .map(|&(_, letter)| letter)
            .collect()
    }

    /// Parses an `$options` string, failing on the first unknown letter.
    pub fn from_letters(letters: &str) -> Result<Self, char> {
        let mut options = RegexOpts::empty();

        for letter in letters.chars() {
            match Self::LETTERS.iter().find(|&&(_, l)| l == letter) {
                Some(&(option, _)) => options |= option,
                None => return Err(letter),
            }
        }

        Ok(options)
    }
}

impl From<RegexOpts> for Bson {
    fn from(options: RegexOpts) -> Self {
        Bson::String(options.letters())
    }
}

impl Serialize for RegexOpts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.letters())
    }
}

impl<'de> Deserialize<'de> for RegexOpts {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let letters = String::deserialize(deserializer)?;

        Self::from_letters(&letters).map_err(|letter| {
            de::Error::custom(format!("unknown regex option `{}`", letter))
        })
    }
}
