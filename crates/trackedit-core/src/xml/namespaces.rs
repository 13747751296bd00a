#![allow(non_snake_case)]

use super::xname::XName;

/// XML Namespace namespace (for xmlns declarations)
pub mod XMLNS {
    pub const NS: &str = "http://www.w3.org/2000/xmlns/";
}

/// The xml: namespace (xml:space, xml:lang)
pub mod XML {
    use super::XName;
    pub const NS: &str = "http://www.w3.org/XML/1998/namespace";

    pub fn space() -> XName {
        XName::new(NS, "space")
    }
}

/// WordprocessingML main namespace
pub mod W {
    use super::XName;
    pub const NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    pub fn document() -> XName { XName::new(NS, "document") }
    pub fn body() -> XName { XName::new(NS, "body") }
    pub fn p() -> XName { XName::new(NS, "p") }
    pub fn r() -> XName { XName::new(NS, "r") }
    pub fn t() -> XName { XName::new(NS, "t") }
    pub fn rPr() -> XName { XName::new(NS, "rPr") }
    pub fn ins() -> XName { XName::new(NS, "ins") }
    pub fn del() -> XName { XName::new(NS, "del") }
    pub fn delText() -> XName { XName::new(NS, "delText") }
    pub fn id() -> XName { XName::new(NS, "id") }
    pub fn author() -> XName { XName::new(NS, "author") }
    pub fn date() -> XName { XName::new(NS, "date") }
    pub fn rsidR() -> XName { XName::new(NS, "rsidR") }
    pub fn rsidDel() -> XName { XName::new(NS, "rsidDel") }
}
