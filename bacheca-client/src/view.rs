use std::path::{Path, PathBuf};

use bacheca_core::{render_page, PageModel, RenderOptions};

/// Superficie di presentazione della bacheca. Viene ridisegnata dopo ogni cambio di stato.
pub trait View: Send {
    fn render(&mut self, page: &PageModel<'_>);

    /// Dopo un invio riuscito il campo del messaggio va svuotato (il nome resta).
    fn clear_input(&mut self) {}
}

/// Scrive la pagina HTML completa su file. La scrittura passa da un file temporaneo
/// accanto alla destinazione, così un browser che ricarica non vede mai una pagina a metà.
pub struct HtmlFileView {
    path: PathBuf,
    opts: RenderOptions,
}

impl HtmlFileView {
    pub fn new(path: impl Into<PathBuf>, opts: RenderOptions) -> Self {
        Self { path: path.into(), opts }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, html: &str) -> std::io::Result<()> {
        let tmp = self.path.with_extension("html.tmp");
        std::fs::write(&tmp, html)?;
        std::fs::rename(&tmp, &self.path)
    }
}

impl View for HtmlFileView {
    fn render(&mut self, page: &PageModel<'_>) {
        let html = render_page(page, &self.opts);
        if let Err(e) = self.write(&html) {
            tracing::warn!(path = %self.path.display(), "cannot write page: {}", e);
        }
    }
}
