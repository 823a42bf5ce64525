//! Synthetic definition names
//!
//! Names are derived from where a shape sits, never from counters, so the
//! same input always yields the same definitions map.

/// Strip everything but ASCII letters and digits and upper-case the first letter
///
/// `"deep-key"` becomes `"Deepkey"`, `"shipping address"` becomes `"Shippingaddress"`.
pub fn clean_name(s: &str) -> String {
    let mut chars = s.chars().filter(char::is_ascii_alphanumeric);
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.collect::<String>(),
        None => String::new(),
    }
}

/// Whether a synthesized name can be used as a definition (and type) name
pub fn is_usable(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_ascii_alphabetic())
}

/// The definition whose body is being lowered
#[derive(Debug, Clone, Copy)]
pub enum Scope<'s> {
    /// The schema's own top-level shape
    Root { title: &'s str },
    /// A named entry of the definitions map
    Named(&'s str),
}

impl Scope<'_> {
    /// Name for an inline shape under property `property`
    pub fn property(&self, property: &str) -> String {
        match self {
            Scope::Root { .. } => clean_name(property),
            Scope::Named(parent) => format!("{}{}", parent, clean_name(property)),
        }
    }

    /// Name for the inline `oneOf` branch at `index`
    pub fn one_of(&self, index: usize) -> String {
        match self {
            Scope::Root { title } => format!("{}{}", clean_name(title), index + 1),
            Scope::Named(parent) => format!("{}OneOf{}", parent, index + 1),
        }
    }

    /// Name for an inline `additionalProperties` shape of this definition
    pub fn additional_properties(&self) -> String {
        match self {
            Scope::Root { .. } => "AdditionalProperties".to_string(),
            Scope::Named(parent) => format!("{}AdditionalProperties", parent),
        }
    }
}

/// Name for the inline value shape of a map property named by `hint`
pub fn map_values(hint: &str) -> String {
    format!("{}AdditionalProperties", hint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("deep"), "Deep");
        assert_eq!(clean_name("deepInternal"), "DeepInternal");
        assert_eq!(clean_name("shipping-address"), "Shippingaddress");
        assert_eq!(clean_name("1st"), "1st");
        assert_eq!(clean_name("--"), "");
    }

    #[test]
    fn test_usable_names() {
        assert!(is_usable("Deep"));
        assert!(!is_usable(""));
        assert!(!is_usable("1"));
        assert!(!is_usable(&Scope::Root { title: "++" }.one_of(0)));
    }

    #[test]
    fn test_scope_names() {
        let root = Scope::Root { title: "My Schema" };
        assert_eq!(root.property("deep"), "Deep");
        assert_eq!(root.one_of(0), "MySchema1");
        assert_eq!(root.additional_properties(), "AdditionalProperties");

        let named = Scope::Named("Deep");
        assert_eq!(named.property("key"), "DeepKey");
        assert_eq!(named.one_of(1), "DeepOneOf2");
        assert_eq!(named.additional_properties(), "DeepAdditionalProperties");
        assert_eq!(map_values("Labels"), "LabelsAdditionalProperties");
    }
}
