//! LLM prompt engineering for field extraction

use immo_domain::FieldSpec;

/// System and user instructions for one extraction call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    /// Role and output discipline
    pub system: String,

    /// Field list, response contract and document text
    pub user: String,
}

impl Prompt {
    /// Single-message form for providers without a system role
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Render the extraction prompt for `document_text` and `fields`
///
/// Pure rendering: the builder never talks to the LLM.
pub fn build_prompt(document_text: &str, fields: &[FieldSpec]) -> Prompt {
    let field_list = fields
        .iter()
        .map(|field| format!("- {}", field))
        .collect::<Vec<_>>()
        .join("\n");

    let mut user = String::new();
    for line in RESPONSE_CONTRACT {
        user.push_str(line);
        user.push('\n');
    }
    user.push_str(&format!(
        "Champs à extraire :\n{}\n\nDocument paginé :\n{}",
        field_list, document_text
    ));

    Prompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user,
    }
}

const SYSTEM_INSTRUCTION: &str = "Tu es un assistant qui extrait des champs factuels depuis un document immobilier. Réponds UNIQUEMENT avec un objet JSON, sans texte avant ou après.";

const RESPONSE_CONTRACT: &[&str] = &[
    "Produit un objet JSON avec exactement les clés dot-path listées ci-dessous.",
    r#"Pour chaque clé, renvoie {"value": <valeur ou "not found">, "page": <numero de page ou null>, "excerpt": <phrase source ou "">}."#,
    r#"Si tu ne trouves pas, value = "not found", page = null, excerpt = ""."#,
    "Si c'est une liste : renvoie un tableau JSON.",
    "Si c'est un boolean : true/false.",
    r#"Si c'est un objet contact : {"email": "...", "telephone": "..."}."#,
];
