use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtensionCategory {
    pub main: &'static str,
    pub sub: &'static str,
}

impl ExtensionCategory {
    const fn new(main: &'static str, sub: &'static str) -> Self {
        Self { main, sub }
    }
}

/// Category for a lower-cased extension. Unknown or missing extensions have
/// none.
pub fn categorize(extension: Option<&str>) -> Option<ExtensionCategory> {
    let category = match extension? {
        "doc" | "docx" => ExtensionCategory::new("document", "word"),
        "pdf" => ExtensionCategory::new("document", "pdf"),
        "txt" => ExtensionCategory::new("document", "text"),
        "rtf" => ExtensionCategory::new("document", "rich_text"),
        "md" => ExtensionCategory::new("document", "markdown"),

        "xls" | "xlsx" => ExtensionCategory::new("spreadsheet", "excel"),
        "xlsm" => ExtensionCategory::new("spreadsheet", "excel_macro"),
        "csv" => ExtensionCategory::new("spreadsheet", "csv"),

        "msg" => ExtensionCategory::new("email", "outlook"),
        "eml" => ExtensionCategory::new("email", "standard"),

        "rvt" => ExtensionCategory::new("model", "revit"),
        "dwg" | "dxf" => ExtensionCategory::new("model", "autocad"),
        "ifc" => ExtensionCategory::new("model", "ifc"),
        "skp" => ExtensionCategory::new("model", "sketchup"),

        "jpg" | "jpeg" => ExtensionCategory::new("image", "jpeg"),
        "png" => ExtensionCategory::new("image", "png"),
        "gif" => ExtensionCategory::new("image", "gif"),
        "bmp" => ExtensionCategory::new("image", "bitmap"),
        "tif" | "tiff" => ExtensionCategory::new("image", "tiff"),

        "py" => ExtensionCategory::new("code", "python"),
        "js" => ExtensionCategory::new("code", "javascript"),
        "html" => ExtensionCategory::new("code", "html"),
        "css" => ExtensionCategory::new("code", "css"),
        "cpp" => ExtensionCategory::new("code", "cpp"),
        "h" => ExtensionCategory::new("code", "cpp_header"),
        "rs" => ExtensionCategory::new("code", "rust"),

        "json" => ExtensionCategory::new("data", "json"),
        "xml" => ExtensionCategory::new("data", "xml"),
        "sql" => ExtensionCategory::new("data", "sql"),
        "db" | "sqlite" => ExtensionCategory::new("data", "database"),

        "zip" => ExtensionCategory::new("archive", "zip"),
        "rar" => ExtensionCategory::new("archive", "rar"),
        "7z" => ExtensionCategory::new("archive", "7zip"),
        "tar" => ExtensionCategory::new("archive", "tar"),
        "gz" => ExtensionCategory::new("archive", "gzip"),
        _ => return None,
    };
    Some(category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown() {
        assert_eq!(
            categorize(Some("dwg")),
            Some(ExtensionCategory {
                main: "model",
                sub: "autocad"
            })
        );
        assert_eq!(categorize(Some("xlsx")).map(|c| c.main), Some("spreadsheet"));
        assert_eq!(categorize(Some("xlsm")).map(|c| c.sub), Some("excel_macro"));
        assert_eq!(categorize(Some("7z")).map(|c| c.sub), Some("7zip"));
        assert_eq!(categorize(Some("xyz")), None);
        assert_eq!(categorize(None), None);
    }
}
