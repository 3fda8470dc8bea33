//! Supported document types and their templates

use crate::error::ExtractorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Kind of real-estate document, selecting the extraction template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    /// Carnet d'entretien de l'immeuble
    Carnet,
    /// Règlement de copropriété
    Reglement,
    /// Dossier technique amiante
    Dta,
    /// Constat de risque d'exposition au plomb
    Crep,
    /// Contrôle technique quinquennal d'ascenseur
    Ct,
    /// Liste des occupants
    Occupants,
    /// Devis ou facture de travaux
    Devis,
}

impl DocType {
    /// Every document type, in display order
    pub const ALL: [DocType; 7] = [
        DocType::Carnet,
        DocType::Reglement,
        DocType::Dta,
        DocType::Crep,
        DocType::Ct,
        DocType::Occupants,
        DocType::Devis,
    ];

    /// Short name used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Carnet => "carnet",
            DocType::Reglement => "reglement",
            DocType::Dta => "dta",
            DocType::Crep => "crep",
            DocType::Ct => "ct",
            DocType::Occupants => "occupants",
            DocType::Devis => "devis",
        }
    }

    /// File name of the empty template
    pub fn template_file_name(&self) -> &'static str {
        match self {
            DocType::Carnet => "carnet_entretien_empty.json",
            DocType::Reglement => "reglement_propriete_empty.json",
            DocType::Dta => "DTA_empty.json",
            DocType::Crep => "CREP_empty.json",
            DocType::Ct => "CT_quinquenal_ascenseur_empty.json",
            DocType::Occupants => "liste_occupant_empty.json",
            DocType::Devis => "devis_facture_travaux_empty.json",
        }
    }

    /// Template path inside `templates_dir`
    pub fn template_path(&self, templates_dir: &Path) -> PathBuf {
        templates_dir.join(self.template_file_name())
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = ExtractorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        DocType::ALL
            .into_iter()
            .find(|doc_type| doc_type.as_str() == name)
            .ok_or_else(|| ExtractorError::Config(format!("unknown document type '{}'", s)))
    }
}

/// Where a filled template goes by default: `<stem>_fill.json` next to it
pub fn default_output_path(template_path: &Path) -> PathBuf {
    let stem = template_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "template".to_string());
    template_path.with_file_name(format!("{}_fill.json", stem))
}
