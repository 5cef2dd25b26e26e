use std::path::Path;

use crate::error::OrderResult;
use crate::library::LibraryOrder;

/// Minimal target descriptor needed by the full-build step.
#[derive(Clone, Debug)]
pub struct Target {
    pub app_name: String,
    pub app_lib: String,
    pub libs: Vec<String>,
    order: LibraryOrder,
}

impl Target {
    /// Create a target using the standard library build order.
    pub fn new(app_name: impl Into<String>, app_lib: impl Into<String>, libs: Vec<String>) -> Self {
        Self {
            app_name: app_name.into(),
            app_lib: app_lib.into(),
            libs,
            order: LibraryOrder::default(),
        }
    }

    /// Use a different library build order.
    pub fn with_order(mut self, order: LibraryOrder) -> Self {
        self.order = order;
        self
    }

    /// Render the descriptor.
    ///
    /// Library paths are reduced to their file names (the build step expects
    /// every library to sit next to the target) and sorted into build order.
    ///
    /// ```
    /// use pbm_order::Target;
    ///
    /// let target = Target::new("a3", "lib/inf1.pbl", vec!["lib/inf1.pbl".into(), "exf1.pbl".into()]);
    /// let text = target.render();
    /// assert!(text.starts_with("Save Format v3.0(19990112)\n"));
    /// assert!(text.contains("liblist \"exf1.pbl;inf1.pbl\";"));
    /// ```
    pub fn render(&self) -> String {
        let mut libs: Vec<&str> = self.libs.iter().map(|l| file_name(l)).collect();
        self.order.sort(&mut libs);

        format!(
            "Save Format v3.0(19990112)\nappname \"{}\";\napplib \"{}\";\nliblist \"{}\";\ntype \"pb\";",
            self.app_name,
            escape_separators(file_name(&self.app_lib)),
            escape_separators(&libs.join(";")),
        )
    }

    /// Write the rendered descriptor to `path`.
    pub fn write(&self, path: &Path) -> OrderResult<()> {
        std::fs::write(path, self.render())?;
        Ok(())
    }
}

/// Last component of a path written with either separator.
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn escape_separators(s: &str) -> String {
    s.replace('\\', "/").replace('/', "\\\\")
}
