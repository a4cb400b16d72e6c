//! Prompts sent to the vision model.
//!
//! Callers can override the classification prompt via
//! [`crate::config::IntakeConfig::system_prompt`]; the constant here is used
//! only when no override is provided. The JSON keys it asks for are the ones
//! [`crate::pipeline::postprocess::parse_classification`] reads.

use crate::model::{DocumentKind, DocumentSide};

/// Default system prompt for classifying one identity-document submission.
pub const CLASSIFICATION_PROMPT: &str = r#"You are an expert in Colombian identity documents. Analyse the provided image(s), classify the document and extract every visible field.

1. DOCUMENT TYPES (documentType)
   - cedula_ciudadania: Colombian citizenship card (laminated, photo, name, number)
   - tarjeta_identidad: Colombian identity card for minors (similar to the cédula)
   - registro_civil_nacimiento: birth certificate (paper form)
   - registro_civil_matrimonio: marriage certificate (paper form)
   - registro_civil_defuncion: death certificate (paper form)
   - unknown: none of the above

2. SIDES (documentSide)
   - front: the face with the photo and the main data
   - back: the face with the barcode, fingerprint and additional data
   - full_document: the image or PDF shows BOTH faces
   - single_page: a one-page document (civil registries)
   - unknown: cannot be determined

3. CHECKS
   - isValidDocument: false for poor photocopies, foreign documents or anything else entirely
   - isLegible: false when text is blurred, cut off or badly lit
   - containsBothSides: true when both faces are visible
   - userFeedback: one or two short, friendly sentences for the user explaining the verdict

4. EXTRACTION (extractedData)
   For each field return {"value": <string or null>, "confidence": <0.0 to 1.0>}.
   - Dates: DD/MM/YYYY
   - Names, surnames and places: UPPERCASE
   - Document numbers: digits only
   - Sex: "M" or "F"
   Fields: numeroDocumento, nombres, apellidos, fechaNacimiento, lugarNacimiento, sexo,
   fechaExpedicion, lugarExpedicion, nombresPadre, apellidosPadre, nombresMadre,
   apellidosMadre, contrayente1Nombres, contrayente1Apellidos, contrayente1Documento,
   contrayente2Nombres, contrayente2Apellidos, contrayente2Documento, fechaDefuncion,
   lugarDefuncion.
   Fields that do not apply or are not legible: {"value": null, "confidence": 0.0}.

5. OUTPUT FORMAT
   - Output ONLY one JSON object with the keys documentType, documentSide,
     isValidDocument, isLegible, containsBothSides, userFeedback, extractedData
   - Do NOT wrap it in ```json fences
   - Do NOT add commentary"#;

/// Build the context message sent alongside the image.
///
/// Only produced once a document kind is on file, i.e. for the second side.
pub fn context_hint(
    expected_side: Option<DocumentSide>,
    expected_kind: Option<DocumentKind>,
) -> Option<String> {
    match (expected_side, expected_kind) {
        (Some(side @ (DocumentSide::Front | DocumentSide::Back)), Some(kind)) => {
            let received = side.opposite().map(DocumentSide::as_str).unwrap_or("other");
            Some(format!(
                "ADDITIONAL CONTEXT: the {} side of a '{}' document is expected. \
The {received} side was already received.",
                side.as_str().to_uppercase(),
                kind.as_str()
            ))
        }
        _ => None,
    }
}
