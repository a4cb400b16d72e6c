//! Domain types shared by the state machine, the ports and the adapters.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Position of the intake flow.
///
/// `AnalyzingFirst` / `AnalyzingSecond` double as the submission lock: the
/// machine refuses new files while a classification is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    #[default]
    AwaitingFirst,
    AnalyzingFirst,
    AwaitingSecond,
    AnalyzingSecond,
    Completed,
    /// Entered only when a consecutive-rejection threshold is configured and
    /// reached. Only `restart()` leaves it.
    Error,
}

impl FlowState {
    /// True when `submit` is allowed.
    pub fn accepts_submissions(self) -> bool {
        matches!(self, FlowState::AwaitingFirst | FlowState::AwaitingSecond)
    }

    /// True while a classification result is pending.
    pub fn is_analyzing(self) -> bool {
        matches!(self, FlowState::AnalyzingFirst | FlowState::AnalyzingSecond)
    }

    /// Whether the UI should offer multi-page documents for selection.
    pub fn accepts_multi_page(self) -> bool {
        self == FlowState::AwaitingFirst
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowState::AwaitingFirst => "awaiting first side",
            FlowState::AnalyzingFirst => "analyzing first side",
            FlowState::AwaitingSecond => "awaiting second side",
            FlowState::AnalyzingSecond => "analyzing second side",
            FlowState::Completed => "completed",
            FlowState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Which face of the document a file shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSide {
    Front,
    Back,
    /// One artifact standing in for both sides (two-sided scan, combined PDF,
    /// or a single-page document).
    Full,
    #[default]
    Unknown,
}

impl DocumentSide {
    /// Parse the spellings a vision model is asked to produce.
    ///
    /// Anything unrecognised is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "front" => DocumentSide::Front,
            "back" => DocumentSide::Back,
            "full" | "full_document" | "single_page" => DocumentSide::Full,
            _ => DocumentSide::Unknown,
        }
    }

    /// The opposite face, for `Front` and `Back` only.
    pub fn opposite(self) -> Option<Self> {
        match self {
            DocumentSide::Front => Some(DocumentSide::Back),
            DocumentSide::Back => Some(DocumentSide::Front),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentSide::Front => "front",
            DocumentSide::Back => "back",
            DocumentSide::Full => "full",
            DocumentSide::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocumentSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity document families the classifier recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    CedulaCiudadania,
    TarjetaIdentidad,
    RegistroCivilNacimiento,
    RegistroCivilMatrimonio,
    RegistroCivilDefuncion,
    #[default]
    Unknown,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 6] = [
        DocumentKind::CedulaCiudadania,
        DocumentKind::TarjetaIdentidad,
        DocumentKind::RegistroCivilNacimiento,
        DocumentKind::RegistroCivilMatrimonio,
        DocumentKind::RegistroCivilDefuncion,
        DocumentKind::Unknown,
    ];

    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == label)
            .unwrap_or(DocumentKind::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::CedulaCiudadania => "cedula_ciudadania",
            DocumentKind::TarjetaIdentidad => "tarjeta_identidad",
            DocumentKind::RegistroCivilNacimiento => "registro_civil_nacimiento",
            DocumentKind::RegistroCivilMatrimonio => "registro_civil_matrimonio",
            DocumentKind::RegistroCivilDefuncion => "registro_civil_defuncion",
            DocumentKind::Unknown => "unknown",
        }
    }

    /// Title printed on the consolidated PDF.
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::CedulaCiudadania => "Cédula de Ciudadanía",
            DocumentKind::TarjetaIdentidad => "Tarjeta de Identidad",
            DocumentKind::RegistroCivilNacimiento => "Registro Civil de Nacimiento",
            DocumentKind::RegistroCivilMatrimonio => "Registro Civil de Matrimonio",
            DocumentKind::RegistroCivilDefuncion => "Registro Civil de Defunción",
            DocumentKind::Unknown => "Document",
        }
    }

    pub fn is_two_sided(self) -> bool {
        matches!(
            self,
            DocumentKind::CedulaCiudadania | DocumentKind::TarjetaIdentidad
        )
    }

    /// Fields whose low confidence raises a review alert.
    pub fn critical_fields(self) -> &'static [Field] {
        use Field::*;
        match self {
            DocumentKind::CedulaCiudadania | DocumentKind::TarjetaIdentidad => {
                &[NumeroDocumento, Nombres, Apellidos, FechaNacimiento]
            }
            DocumentKind::RegistroCivilNacimiento => &[
                NumeroDocumento,
                Nombres,
                Apellidos,
                FechaNacimiento,
                NombresPadre,
                ApellidosPadre,
                NombresMadre,
                ApellidosMadre,
            ],
            DocumentKind::RegistroCivilMatrimonio => &[
                NumeroDocumento,
                Nombres,
                Apellidos,
                Contrayente1Nombres,
                Contrayente1Apellidos,
                Contrayente2Nombres,
                Contrayente2Apellidos,
            ],
            DocumentKind::RegistroCivilDefuncion => {
                &[NumeroDocumento, Nombres, Apellidos, FechaDefuncion]
            }
            DocumentKind::Unknown => &[NumeroDocumento, Nombres, Apellidos],
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A data field the vision model may read off a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    NumeroDocumento,
    Nombres,
    Apellidos,
    FechaNacimiento,
    LugarNacimiento,
    Sexo,
    FechaExpedicion,
    LugarExpedicion,
    NombresPadre,
    ApellidosPadre,
    NombresMadre,
    ApellidosMadre,
    Contrayente1Nombres,
    Contrayente1Apellidos,
    Contrayente1Documento,
    Contrayente2Nombres,
    Contrayente2Apellidos,
    Contrayente2Documento,
    FechaDefuncion,
    LugarDefuncion,
}

impl Field {
    pub const ALL: [Field; 20] = [
        Field::NumeroDocumento,
        Field::Nombres,
        Field::Apellidos,
        Field::FechaNacimiento,
        Field::LugarNacimiento,
        Field::Sexo,
        Field::FechaExpedicion,
        Field::LugarExpedicion,
        Field::NombresPadre,
        Field::ApellidosPadre,
        Field::NombresMadre,
        Field::ApellidosMadre,
        Field::Contrayente1Nombres,
        Field::Contrayente1Apellidos,
        Field::Contrayente1Documento,
        Field::Contrayente2Nombres,
        Field::Contrayente2Apellidos,
        Field::Contrayente2Documento,
        Field::FechaDefuncion,
        Field::LugarDefuncion,
    ];

    /// Key used in the vision model's JSON response.
    pub fn key(self) -> &'static str {
        match self {
            Field::NumeroDocumento => "numeroDocumento",
            Field::Nombres => "nombres",
            Field::Apellidos => "apellidos",
            Field::FechaNacimiento => "fechaNacimiento",
            Field::LugarNacimiento => "lugarNacimiento",
            Field::Sexo => "sexo",
            Field::FechaExpedicion => "fechaExpedicion",
            Field::LugarExpedicion => "lugarExpedicion",
            Field::NombresPadre => "nombresPadre",
            Field::ApellidosPadre => "apellidosPadre",
            Field::NombresMadre => "nombresMadre",
            Field::ApellidosMadre => "apellidosMadre",
            Field::Contrayente1Nombres => "contrayente1Nombres",
            Field::Contrayente1Apellidos => "contrayente1Apellidos",
            Field::Contrayente1Documento => "contrayente1Documento",
            Field::Contrayente2Nombres => "contrayente2Nombres",
            Field::Contrayente2Apellidos => "contrayente2Apellidos",
            Field::Contrayente2Documento => "contrayente2Documento",
            Field::FechaDefuncion => "fechaDefuncion",
            Field::LugarDefuncion => "lugarDefuncion",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    /// Human-readable name used in review alerts.
    pub fn label(self) -> &'static str {
        match self {
            Field::NumeroDocumento => "Document number",
            Field::Nombres => "Given names",
            Field::Apellidos => "Surnames",
            Field::FechaNacimiento => "Date of birth",
            Field::LugarNacimiento => "Place of birth",
            Field::Sexo => "Sex",
            Field::FechaExpedicion => "Date of issue",
            Field::LugarExpedicion => "Place of issue",
            Field::NombresPadre => "Father's given names",
            Field::ApellidosPadre => "Father's surnames",
            Field::NombresMadre => "Mother's given names",
            Field::ApellidosMadre => "Mother's surnames",
            Field::Contrayente1Nombres => "Spouse 1 given names",
            Field::Contrayente1Apellidos => "Spouse 1 surnames",
            Field::Contrayente1Documento => "Spouse 1 document",
            Field::Contrayente2Nombres => "Spouse 2 given names",
            Field::Contrayente2Apellidos => "Spouse 2 surnames",
            Field::Contrayente2Documento => "Spouse 2 document",
            Field::FechaDefuncion => "Date of death",
            Field::LugarDefuncion => "Place of death",
        }
    }
}

/// One value read off a document, with the model's confidence in it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: Option<String>,
    #[serde(default)]
    pub confidence: f32,
}

impl ExtractedField {
    pub fn new(value: impl Into<String>, confidence: f32) -> Self {
        Self {
            value: Some(value.into()),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }
}

/// Fields read from one or both sides. Absent fields are simply missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedData(pub BTreeMap<Field, ExtractedField>);

impl ExtractedData {
    pub fn get(&self, field: Field) -> Option<&ExtractedField> {
        self.0.get(&field)
    }

    pub fn insert(&mut self, field: Field, value: ExtractedField) {
        self.0.insert(field, value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|f| !f.is_present())
    }
}

/// The Classification Port's verdict on one submitted file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub is_valid: bool,
    pub is_legible: bool,
    pub detected_side: DocumentSide,
    pub feedback: String,
    #[serde(default)]
    pub kind: DocumentKind,
    #[serde(default)]
    pub extracted: ExtractedData,
}

impl ClassificationResult {
    /// Rejection-shaped result used when classification itself failed.
    pub fn failed(feedback: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            is_legible: false,
            detected_side: DocumentSide::Unknown,
            feedback: feedback.into(),
            kind: DocumentKind::Unknown,
            extracted: ExtractedData::default(),
        }
    }

    /// Accepted result for the given side and kind.
    pub fn accepted(kind: DocumentKind, side: DocumentSide, feedback: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            is_legible: true,
            detected_side: side,
            feedback: feedback.into(),
            kind,
            extracted: ExtractedData::default(),
        }
    }
}

/// A file handed to the machine. Cloning shares the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SubmittedFile {
    pub name: String,
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

impl SubmittedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME || has_pdf_signature(&self.data)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

impl fmt::Debug for SubmittedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmittedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.data.len())
            .finish()
    }
}

pub const PDF_MIME: &str = "application/pdf";

/// True when `data` starts with the `%PDF-` header.
pub fn has_pdf_signature(data: &[u8]) -> bool {
    data.starts_with(b"%PDF-")
}

/// How the final artifact came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    /// The submitted multi-page document, passed through untouched.
    Original,
    /// One image depicting both sides, laid out on a page.
    SingleFull,
    /// Front and back images laid out on one page.
    TwoSided,
}

/// The downloadable result of a completed session.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub file_name: String,
    pub mime_type: String,
    #[serde(skip)]
    pub data: Arc<[u8]>,
    pub source: ArtifactSource,
}

impl Artifact {
    pub fn pdf(file_name: impl Into<String>, data: impl Into<Arc<[u8]>>, source: ArtifactSource) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: PDF_MIME.to_string(),
            data: data.into(),
            source,
        }
    }

    /// `<kind>_<YYYYmmdd-HHMMSS>.pdf`, the name every produced PDF carries.
    pub fn file_name_for(kind: DocumentKind) -> String {
        format!("{}_{}.pdf", kind.as_str(), Utc::now().format("%Y%m%d-%H%M%S"))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("file_name", &self.file_name)
            .field("source", &self.source)
            .field("len", &self.data.len())
            .finish()
    }
}
