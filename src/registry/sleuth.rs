//! Entry point tying detectors, handlers and the known-types registry together.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::core::known::KnownTypes;
use crate::core::result_set::MimeTypeSet;
use crate::core::types::{MimeError, MimeType};
use crate::detector::{Detector, DetectorError, SeekRead};
use crate::matching::source::{ByteSource, SeekSource, SliceSource};
use crate::matching::text::DEFAULT_SAMPLE_SIZE;
use crate::registry::config::{ConfigError, SleuthConfig};
use crate::registry::detectors::DetectorRegistry;
use crate::registry::handler::{HandlerChain, MimeHandler};

static GLOBAL: Lazy<MimeSleuth> = Lazy::new(|| {
    MimeSleuth::new().unwrap_or_else(|e| {
        error!(error = %e, "Failed to build default detectors; classification will report unknown");
        MimeSleuth::bare(MimeType::octet_stream())
    })
});

/// One input to classify
enum Input<'a> {
    Name(&'a str),
    Path(&'a Path),
    File(&'a mut File),
    Bytes(&'a [u8]),
    Stream(&'a mut dyn SeekRead),
    Upload { name: Option<&'a str>, data: &'a [u8] },
}

impl Input<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Input::Name(_) => "name",
            Input::Path(_) => "path",
            Input::File(_) => "file",
            Input::Bytes(_) => "bytes",
            Input::Stream(_) => "stream",
            Input::Upload { .. } => "upload",
        }
    }
}

/// Runs every registered detector over an input, merges their results and
/// applies the handler chain
pub struct MimeSleuth {
    detectors: DetectorRegistry,
    handlers: RwLock<HandlerChain>,
    known: KnownTypes,
    unknown: MimeType,
    sample_size: usize,
}

impl MimeSleuth {
    /// Build with the default configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an embedded table fails to load.
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_config(&SleuthConfig::default())
    }

    /// Build from a configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an invalid unknown type, an unknown detector or
    /// handler id, or a table or rule file that cannot be loaded.
    pub fn with_config(config: &SleuthConfig) -> Result<Self, ConfigError> {
        let unknown: MimeType = config.unknown_mime_type.parse()?;
        let mut sleuth = Self::bare(unknown);
        sleuth.sample_size = config.text_sample_size;

        let extensions = config.extension_table()?;
        sleuth.known.add_all(extensions.mime_types());

        for detector in config.build_detectors(&extensions)? {
            sleuth.detectors.register(detector);
        }
        *sleuth.handlers.get_mut() = config.build_handlers()?;
        Ok(sleuth)
    }

    /// No detectors or handlers; everything classifies as `unknown`
    pub fn bare(unknown: MimeType) -> Self {
        let known = KnownTypes::new();
        known.add(&unknown);
        Self {
            detectors: DetectorRegistry::new(),
            handlers: RwLock::new(HandlerChain::new()),
            known,
            unknown,
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }

    /// Process-wide instance built from the default configuration
    pub fn global() -> &'static MimeSleuth {
        &GLOBAL
    }

    pub fn unknown_type(&self) -> &MimeType {
        &self.unknown
    }

    /// Classify from a file name alone
    pub fn classify_name(&self, name: &str) -> MimeTypeSet {
        self.classify(Input::Name(name))
    }

    pub fn classify_path(&self, path: &Path) -> MimeTypeSet {
        self.classify(Input::Path(path))
    }

    /// Classify an open file. Its position is unchanged afterwards.
    pub fn classify_file(&self, file: &mut File) -> MimeTypeSet {
        self.classify(Input::File(file))
    }

    pub fn classify_bytes(&self, data: &[u8]) -> MimeTypeSet {
        self.classify(Input::Bytes(data))
    }

    /// Classify a stream. Its position is unchanged afterwards.
    pub fn classify_stream(&self, stream: &mut dyn SeekRead) -> MimeTypeSet {
        self.classify(Input::Stream(stream))
    }

    /// Classify uploaded content together with its client-supplied name.
    /// The name is only matched, never opened.
    pub fn classify_upload(&self, name: Option<&str>, data: &[u8]) -> MimeTypeSet {
        self.classify(Input::Upload { name, data })
    }

    /// Add a detector. A detector whose name is already registered is not
    /// replaced; the existing instance is returned instead.
    pub fn register_detector(&self, detector: Arc<dyn Detector>) -> Arc<dyn Detector> {
        self.detectors.register(detector)
    }

    pub fn unregister_detector(&self, name: &str) -> Option<Arc<dyn Detector>> {
        self.detectors.unregister(name)
    }

    pub fn detector(&self, name: &str) -> Option<Arc<dyn Detector>> {
        self.detectors.get(name)
    }

    /// Registered detectors in the order they run
    pub fn detectors(&self) -> Vec<Arc<dyn Detector>> {
        self.detectors.snapshot()
    }

    /// Append a handler to the end of the chain
    pub fn register_handler(&self, handler: Box<dyn MimeHandler>) {
        self.handlers.write().push(handler);
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers
            .read()
            .names()
            .into_iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn add_known_type(&self, mime_type: &MimeType) {
        self.known.add(mime_type);
    }

    /// # Errors
    ///
    /// Returns `MimeError::InvalidMimeTypeFormat` if the string is not `media/sub`.
    pub fn add_known_type_str(&self, mime_type: &str) -> Result<(), MimeError> {
        self.known.add_str(mime_type)
    }

    pub fn is_known_type(&self, mime_type: &MimeType) -> bool {
        self.known.contains(mime_type)
    }

    pub fn is_known_type_str(&self, mime_type: &str) -> bool {
        self.known.contains_str(mime_type)
    }

    pub fn known_types(&self) -> &KnownTypes {
        &self.known
    }

    /// Highest-specificity type of a result; the earliest wins ties
    pub fn most_specific(result: &MimeTypeSet) -> Option<&MimeType> {
        result.most_specific()
    }

    fn classify(&self, mut input: Input<'_>) -> MimeTypeSet {
        let kind = input.kind();
        let content = self.content_sample(&mut input);
        let handlers = self.handlers.read();
        let mut pass = handlers.start();
        let mut result = MimeTypeSet::new();

        for detector in self.detectors.snapshot() {
            let outcome = match &mut input {
                Input::Name(name) => detector.classify_name(name),
                Input::Path(path) => detector.classify_path(path),
                Input::File(file) => detector.classify_file(file),
                Input::Bytes(data) => detector.classify_bytes(data),
                Input::Stream(stream) => detector.classify_stream(&mut **stream),
                Input::Upload { name, data } => classify_upload_with(detector.as_ref(), *name, data),
            };
            match outcome {
                Ok(found) => {
                    if found.is_empty() {
                        continue;
                    }
                    result.union(&found);
                    handlers.apply(&mut pass, &mut result, &content);
                }
                Err(e) if e.is_unsupported() => {}
                Err(e) => {
                    error!(detector = detector.name(), input = kind, error = %e, "Detector failed");
                }
            }
        }

        if result.is_empty() {
            result.insert(self.unknown.clone());
        }
        self.known.add_all(result.iter());
        debug!(input = kind, result = %result, "Classified");
        result
    }

    /// Leading bytes handed to the handler chain
    fn content_sample(&self, input: &mut Input<'_>) -> Vec<u8> {
        let sampled = match input {
            Input::Name(_) => return Vec::new(),
            Input::Path(path) => {
                if path.is_dir() {
                    return Vec::new();
                }
                File::open(path).and_then(|mut file| {
                    let mut source = SeekSource::new(&mut file)?;
                    source.read_vec(0, self.sample_size)
                })
            }
            Input::File(file) => {
                SeekSource::new(&mut **file).and_then(|mut s| s.read_vec(0, self.sample_size))
            }
            Input::Bytes(data) | Input::Upload { data, .. } => {
                SliceSource::new(data).read_vec(0, self.sample_size)
            }
            Input::Stream(stream) => {
                SeekSource::new(&mut **stream).and_then(|mut s| s.read_vec(0, self.sample_size))
            }
        };
        sampled.unwrap_or_else(|e| {
            debug!(error = %e, "Could not sample content for handlers");
            Vec::new()
        })
    }
}

/// Uploads are matched by name and by content; either may be unsupported
fn classify_upload_with(
    detector: &dyn Detector,
    name: Option<&str>,
    data: &[u8],
) -> Result<MimeTypeSet, DetectorError> {
    let by_content = detector.classify_bytes(data);
    let Some(name) = name else {
        return by_content;
    };
    let by_name = detector.classify_name(name);
    match (by_content, by_name) {
        (Err(e), Err(_)) => Err(e),
        (Ok(found), Err(e)) | (Err(e), Ok(found)) if !e.is_unsupported() => {
            error!(detector = detector.name(), error = %e, "Detector partially failed");
            Ok(found)
        }
        (Ok(found), Err(_)) | (Err(_), Ok(found)) => Ok(found),
        (Ok(mut found), Ok(named)) => {
            found.union(&named);
            Ok(found)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{ExtensionDetector, MagicDetector, TextDetector};
    use std::io::{Cursor, Seek, SeekFrom};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_default_classifies_png_bytes() {
        let sleuth = MimeSleuth::new().unwrap();
        let result = sleuth.classify_bytes(PNG);
        let png = result.get(&"image/png".parse().unwrap()).unwrap();
        assert!(png.mime_type.specificity() >= 1);
        assert_eq!(MimeSleuth::most_specific(&result).unwrap(), "image/png");
    }

    #[test]
    fn test_unknown_fallback() {
        let sleuth = MimeSleuth::bare("application/x-mystery".parse().unwrap());
        assert_eq!(sleuth.classify_bytes(b"\0\x01"), "application/x-mystery");
        assert!(sleuth.is_known_type_str("application/x-mystery"));
    }

    #[test]
    fn test_empty_buffer_is_empty_type() {
        let sleuth = MimeSleuth::new().unwrap();
        let result = sleuth.classify_bytes(b"");
        assert!(result.contains_str("application/x-empty"));
        assert!(!result.contains_str("application/octet-stream"));
    }

    #[test]
    fn test_name_only_uses_extension() {
        let sleuth = MimeSleuth::new().unwrap();
        assert_eq!(sleuth.classify_name("holiday.png"), "image/png");
        assert_eq!(sleuth.classify_name("no_extension"), "application/octet-stream");
    }

    #[test]
    fn test_stream_position_restored_without_match() {
        let sleuth = MimeSleuth::new().unwrap();
        let mut cursor = Cursor::new(vec![0u8, 1, 2, 3, 4, 5, 6, 7]);
        cursor.seek(SeekFrom::Start(3)).unwrap();
        let result = sleuth.classify_stream(&mut cursor);
        assert_eq!(result, "application/octet-stream");
        assert_eq!(cursor.position(), 3);
    }

    #[test]
    fn test_duplicate_registration() {
        let sleuth = MimeSleuth::bare(MimeType::octet_stream());
        let first: Arc<dyn Detector> = Arc::new(MagicDetector::embedded());
        sleuth.register_detector(Arc::clone(&first));
        let returned = sleuth.register_detector(Arc::new(MagicDetector::embedded()));
        assert!(Arc::ptr_eq(&first, &returned));
        assert_eq!(sleuth.detectors().len(), 1);
    }

    #[test]
    fn test_detectors_agreeing_raise_specificity() {
        let sleuth = MimeSleuth::new().unwrap();
        let result = sleuth.classify_upload(Some("logo.png"), PNG);
        let png = result.get(&"image/png".parse().unwrap()).unwrap();
        // Magic contributes 3 for the full header, the extension adds 1
        assert_eq!(png.mime_type.specificity(), 4);
    }

    #[test]
    fn test_upload_name_never_opened() {
        let sleuth = MimeSleuth::new().unwrap();
        let result = sleuth.classify_upload(Some("/etc/passwd"), b"\0\0\0\0");
        assert_eq!(result, "application/octet-stream");
    }

    #[test]
    fn test_svg_handler_rewrites_xml() {
        let sleuth = MimeSleuth::new().unwrap();
        let svg = b"<?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"></svg>";
        let result = sleuth.classify_bytes(svg);
        assert!(result.contains_str("image/svg+xml"));
    }

    #[test]
    fn test_xml_handler_with_text_detector() {
        let sleuth = MimeSleuth::bare(MimeType::octet_stream());
        sleuth.register_detector(Arc::new(TextDetector::new()));
        sleuth.register_handler(Box::new(crate::registry::handler::XmlHandler::new().unwrap()));
        let result = sleuth.classify_bytes(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><a/>");
        let entry = result.detected().next().unwrap();
        assert_eq!(entry.mime_type, "text/xml");
        assert_eq!(entry.encoding.as_deref(), Some("ISO-8859-1"));
    }

    #[test]
    fn test_classified_types_become_known() {
        let sleuth = MimeSleuth::bare(MimeType::octet_stream());
        sleuth.register_detector(Arc::new(MagicDetector::embedded()));
        assert!(!sleuth.is_known_type_str("image/gif"));
        sleuth.classify_bytes(b"GIF89a\x01\0\x01\0");
        assert!(sleuth.is_known_type_str("image/gif"));
    }

    #[test]
    fn test_extension_types_seeded_as_known() {
        let sleuth = MimeSleuth::new().unwrap();
        assert!(sleuth.is_known_type_str("application/pdf"));
        sleuth.add_known_type_str("application/x-custom").unwrap();
        assert!(sleuth.is_known_type_str("application/x-custom"));
        assert!(sleuth.add_known_type_str("nonsense").is_err());
    }

    #[test]
    fn test_unregister_detector() {
        let sleuth = MimeSleuth::bare(MimeType::octet_stream());
        let detector = sleuth.register_detector(Arc::new(ExtensionDetector::default()));
        let name = detector.name().to_string();
        assert!(sleuth.detector(&name).is_some());
        assert!(sleuth.unregister_detector(&name).is_some());
        assert!(sleuth.detectors().is_empty());
    }

    #[test]
    fn test_global_instance() {
        let global = MimeSleuth::global();
        assert!(!global.detectors().is_empty());
        assert_eq!(global.unknown_type(), "application/octet-stream");
    }
}
