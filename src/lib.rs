mod color;
mod debug;
mod error;
mod gradient;
mod grid;
mod minmax;
mod resolver;
mod value;

pub use color::{Rgb, parse_color};
pub use error::{CssValueError, Result};
pub use gradient::{
    ColorOrVar, GradientDirection, GradientStop, LengthOrVar, ParsedGradient, Unit,
    format_linear_gradient, parse_linear_gradient,
};
pub use grid::{
    GridAxisMode, GridTemplateSupport, MAX_EXPANDED_TRACKS, MAX_REPEAT_COUNT, Track,
    UnsupportedKind,
    check_grid_template_support, classify_axis_mode, is_editable_mode, is_implicit_mode,
    parse_track_list, serialize_track_list,
};
pub use minmax::{Minmax, parse_minmax, serialize_minmax};
pub use resolver::{
    BatchResolution, CustomPropertyResolver, MAX_RESOLVED_CHAIN, MAX_SUBSTITUTION_DEPTH,
    RawCustomProperties, Resolution, extract_custom_properties, resolve_batch,
    resolve_custom_properties,
};
pub use value::{Node, VarRef, parse_value};

use debug::DebugLogger;
use std::path::PathBuf;

/// Environment variable consulted for a debug log path when the builder has none.
pub const DEBUG_LOG_ENV: &str = "CSS_VALUE_ENGINE_DEBUG_LOG";

/// Configured entry point bundling the value codecs and the resolver.
#[derive(Clone)]
pub struct CssValueEngine {
    resolver: CustomPropertyResolver,
    debug: Option<DebugLogger>,
}

pub struct CssValueEngineBuilder {
    debug_path: Option<PathBuf>,
    minify: bool,
}

impl CssValueEngine {
    pub fn builder() -> CssValueEngineBuilder {
        CssValueEngineBuilder::new()
    }

    pub fn resolver(&self) -> &CustomPropertyResolver {
        &self.resolver
    }

    pub fn resolve<F>(&self, css: &str, on_diagnostic: F) -> Result<Resolution>
    where
        F: FnMut(bool, &str),
    {
        self.resolver.resolve(css, on_diagnostic)
    }

    pub fn resolve_batch(&self, sheets: &[&str]) -> Vec<Result<BatchResolution>> {
        self.resolver.resolve_batch(sheets)
    }

    pub fn parse_track_list(&self, text: &str) -> Vec<Track> {
        parse_track_list(text)
    }

    pub fn serialize_track_list(&self, tracks: &[Track]) -> String {
        serialize_track_list(tracks)
    }

    pub fn check_grid_template_support(&self, text: &str) -> GridTemplateSupport {
        check_grid_template_support(text)
    }

    pub fn parse_minmax(&self, text: &str) -> Option<Minmax> {
        parse_minmax(text)
    }

    pub fn parse_linear_gradient(&self, text: &str) -> Option<ParsedGradient> {
        parse_linear_gradient(text)
    }

    pub fn format_linear_gradient(&self, gradient: &ParsedGradient) -> String {
        format_linear_gradient(gradient)
    }

    pub fn flush_debug(&self) {
        if let Some(logger) = &self.debug {
            logger.flush();
        }
    }
}

impl Default for CssValueEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CssValueEngineBuilder {
    pub fn new() -> Self {
        Self {
            debug_path: None,
            minify: true,
        }
    }

    // Enable debug logging to a JSONL file for resolver inspection.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn build(self) -> Result<CssValueEngine> {
        let debug_path = self.debug_path.or_else(|| {
            std::env::var(DEBUG_LOG_ENV)
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
        });
        if let Some(path) = &debug_path {
            if path.as_os_str().is_empty() {
                return Err(CssValueError::InvalidConfiguration(
                    "debug_log path must not be empty".to_string(),
                ));
            }
            if path.is_dir() {
                return Err(CssValueError::InvalidConfiguration(format!(
                    "debug_log path {} is a directory",
                    path.display()
                )));
            }
        }
        let debug = if let Some(path) = debug_path {
            Some(DebugLogger::new(path)?)
        } else {
            None
        };
        Ok(CssValueEngine {
            resolver: CustomPropertyResolver::with_options(self.minify, debug.clone()),
            debug,
        })
    }
}
