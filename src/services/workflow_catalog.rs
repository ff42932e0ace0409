// src/services/workflow_catalog.rs
//
// Catálogo embutido de etapas por país / tipo de visto, mais as sobrescritas
// gravadas no banco. A sobrescrita sempre ganha do catálogo.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::{
    common::error::AppError,
    db::WorkflowRepository,
    models::{
        auth::{Actor, UserRole},
        client::WorkflowStep,
        workflow::{ResolvedWorkflow, TemplateSource, WorkflowTemplate},
    },
    services::role_policy,
};

struct StepDef {
    title: &'static str,
    description: &'static str,
    documents: &'static [&'static str],
    duration: &'static str,
}

struct VisaDef {
    visa_type: &'static str,
    steps: &'static [StepDef],
}

struct CountryDef {
    country: &'static str,
    visas: &'static [VisaDef],
}

// =============================================================================
//  NORMALIZAÇÃO
// =============================================================================

// Rótulos em inglês -> rótulos do catálogo
const VISA_ALIASES: &[(&str, &str)] = &[
    ("work permit", "Permis de travail"),
    ("study permit", "Permis d'études"),
    ("student visa", "Visa Étudiant"),
    ("permanent residence", "Résidence Permanente"),
    ("tourist visa", "Visa Touriste"),
    ("family reunification", "Regroupement Familial"),
    ("work visa", "Visa de Travail"),
];

const COUNTRY_ALIASES: &[(&str, &str)] = &[
    ("belgium", "Belgique"),
    ("germany", "Allemagne"),
];

/// Chave de comparação: minúsculas, sem acentos, espaços colapsados.
pub fn normalize_key(value: &str) -> String {
    // NFD separa a letra base do acento; as marcas combinantes caem fora
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == '’' { '\'' } else { c })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn canonical_visa_type(visa_type: &str) -> String {
    let key = normalize_key(visa_type);
    VISA_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| visa_type.trim().to_string())
}

pub fn canonical_country(country: &str) -> String {
    let key = normalize_key(country);
    COUNTRY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| country.trim().to_string())
}

/// Etapas do catálogo embutido, se houver.
pub fn catalog_steps(country: &str, visa_type: &str) -> Option<Vec<WorkflowStep>> {
    let country_key = normalize_key(&canonical_country(country));
    let visa_key = normalize_key(&canonical_visa_type(visa_type));

    CATALOG
        .iter()
        .find(|c| normalize_key(c.country) == country_key)?
        .visas
        .iter()
        .find(|v| normalize_key(v.visa_type) == visa_key)
        .map(|v| {
            v.steps
                .iter()
                .map(|s| WorkflowStep {
                    title: s.title.to_string(),
                    description: s.description.to_string(),
                    documents: s.documents.iter().map(|d| d.to_string()).collect(),
                    duration: s.duration.to_string(),
                })
                .collect()
        })
}

// =============================================================================
//  SERVIÇO
// =============================================================================

#[derive(Clone)]
pub struct WorkflowService {
    repo: WorkflowRepository,
}

impl WorkflowService {
    pub fn new(repo: WorkflowRepository) -> Self {
        Self { repo }
    }

    /// Sobrescrita primeiro, depois o catálogo. Sem correspondência: lista vazia.
    pub async fn resolve(&self, country: &str, visa_type: &str) -> Result<ResolvedWorkflow, AppError> {
        let country_label = canonical_country(country);
        let visa_label = canonical_visa_type(visa_type);

        let stored = self
            .repo
            .find(&normalize_key(&country_label), &normalize_key(&visa_label))
            .await?;

        let (source, steps) = match stored {
            Some(template) => (TemplateSource::Override, template.steps.0),
            None => match catalog_steps(&country_label, &visa_label) {
                Some(steps) => (TemplateSource::Catalog, steps),
                None => {
                    tracing::info!(
                        country = %country_label,
                        visa_type = %visa_label,
                        "Nenhum workflow encontrado, processo criado sem etapas"
                    );
                    (TemplateSource::None, Vec::new())
                }
            },
        };

        Ok(ResolvedWorkflow {
            country: country_label,
            visa_type: visa_label,
            source,
            steps,
        })
    }

    pub async fn upsert(
        &self,
        actor: &Actor,
        country: &str,
        visa_type: &str,
        steps: &[WorkflowStep],
    ) -> Result<WorkflowTemplate, AppError> {
        role_policy::ensure(actor.role == UserRole::Superadmin)?;

        let country_key = normalize_key(&canonical_country(country));
        let visa_key = normalize_key(&canonical_visa_type(visa_type));
        let template = self.repo.upsert(&country_key, &visa_key, steps, actor.id).await?;

        tracing::info!(country = %country_key, visa_type = %visa_key, by = %actor.id, "Workflow sobrescrito");
        Ok(template)
    }
}

// =============================================================================
//  CATÁLOGO
// =============================================================================

const CATALOG: &[CountryDef] = &[
    CountryDef {
        country: "Canada",
        visas: &[
            VisaDef {
                visa_type: "Permis de travail",
                steps: &[
                    StepDef {
                        title: "Évaluation du profil",
                        description: "Analyse de l'admissibilité et du parcours professionnel",
                        documents: &["CV", "Passeport"],
                        duration: "1 semaine",
                    },
                    StepDef {
                        title: "Recherche d'employeur",
                        description: "Identification d'un employeur canadien prêt à embaucher",
                        documents: &["CV adapté au format canadien", "Lettres de recommandation"],
                        duration: "4 à 8 semaines",
                    },
                    StepDef {
                        title: "Offre d'emploi",
                        description: "Obtention d'une offre d'emploi écrite et signée",
                        documents: &["Offre d'emploi signée", "Contrat de travail"],
                        duration: "2 semaines",
                    },
                    StepDef {
                        title: "EIMT",
                        description: "Étude d'impact sur le marché du travail déposée par l'employeur",
                        documents: &["Numéro EIMT", "Lettre de l'employeur"],
                        duration: "8 à 12 semaines",
                    },
                    StepDef {
                        title: "Constitution du dossier",
                        description: "Rassemblement des pièces justificatives",
                        documents: &["Diplômes", "Relevés bancaires", "Photos d'identité"],
                        duration: "2 semaines",
                    },
                    StepDef {
                        title: "Formulaires IRCC",
                        description: "Remplissage des formulaires officiels d'immigration",
                        documents: &["IMM 1295", "IMM 5645"],
                        duration: "1 semaine",
                    },
                    StepDef {
                        title: "Paiement des frais",
                        description: "Règlement des frais de traitement gouvernementaux",
                        documents: &["Reçu de paiement IRCC"],
                        duration: "1 jour",
                    },
                    StepDef {
                        title: "Biométrie",
                        description: "Prise des empreintes et de la photo au centre agréé",
                        documents: &["Lettre d'instruction biométrique"],
                        duration: "2 semaines",
                    },
                    StepDef {
                        title: "Examen médical",
                        description: "Visite médicale auprès d'un médecin désigné",
                        documents: &["Formulaire IMM 1017", "Résultats médicaux"],
                        duration: "1 semaine",
                    },
                    StepDef {
                        title: "Décision et visa",
                        description: "Réception de la décision et de la lettre d'introduction",
                        documents: &["Lettre d'introduction", "Passeport visé"],
                        duration: "4 à 16 semaines",
                    },
                ],
            },
            VisaDef {
                visa_type: "Permis d'études",
                steps: &[
                    StepDef {
                        title: "Choix de l'établissement",
                        description: "Sélection d'un établissement d'enseignement désigné",
                        documents: &["Relevés de notes", "Diplômes"],
                        duration: "2 semaines",
                    },
                    StepDef {
                        title: "Lettre d'acceptation",
                        description: "Admission dans l'établissement choisi",
                        documents: &["Lettre d'acceptation"],
                        duration: "4 à 8 semaines",
                    },
                    StepDef {
                        title: "CAQ",
                        description: "Certificat d'acceptation du Québec si applicable",
                        documents: &["Formulaire CAQ", "Preuve de fonds"],
                        duration: "4 semaines",
                    },
                    StepDef {
                        title: "Preuve de fonds",
                        description: "Justification des ressources financières",
                        documents: &["Relevés bancaires", "Attestation de prise en charge"],
                        duration: "1 semaine",
                    },
                    StepDef {
                        title: "Dépôt de la demande",
                        description: "Soumission de la demande de permis d'études",
                        documents: &["Passeport", "Photos d'identité"],
                        duration: "1 semaine",
                    },
                    StepDef {
                        title: "Biométrie",
                        description: "Prise des empreintes et de la photo",
                        documents: &["Lettre d'instruction biométrique"],
                        duration: "2 semaines",
                    },
                    StepDef {
                        title: "Décision",
                        description: "Réception de la lettre d'introduction",
                        documents: &["Lettre d'introduction"],
                        duration: "4 à 12 semaines",
                    },
                ],
            },
            VisaDef {
                visa_type: "Résidence Permanente",
                steps: &[
                    StepDef {
                        title: "Évaluation Entrée express",
                        description: "Calcul du score CRS et stratégie",
                        documents: &["CV", "Diplômes"],
                        duration: "1 semaine",
                    },
                    StepDef {
                        title: "Tests de langue",
                        description: "Passage du TEF ou de l'IELTS",
                        documents: &["Résultats TEF/IELTS"],
                        duration: "4 semaines",
                    },
                    StepDef {
                        title: "Équivalence des diplômes",
                        description: "Évaluation des diplômes d'études (EDE)",
                        documents: &["Rapport EDE"],
                        duration: "6 semaines",
                    },
                    StepDef {
                        title: "Création du profil",
                        description: "Profil Entrée express et attente d'invitation",
                        documents: &["Numéro de profil"],
                        duration: "Variable",
                    },
                    StepDef {
                        title: "Demande de résidence",
                        description: "Dépôt complet après invitation",
                        documents: &["Certificats de police", "Examen médical"],
                        duration: "60 jours",
                    },
                    StepDef {
                        title: "Confirmation de résidence",
                        description: "Réception de la CRP",
                        documents: &["CRP"],
                        duration: "6 mois",
                    },
                ],
            },
            VisaDef {
                visa_type: "Visa Touriste",
                steps: &[
                    StepDef {
                        title: "Constitution du dossier",
                        description: "Justificatifs de voyage et d'attaches au pays",
                        documents: &["Passeport", "Relevés bancaires", "Attestation d'emploi"],
                        duration: "1 semaine",
                    },
                    StepDef {
                        title: "Dépôt de la demande",
                        description: "Soumission en ligne",
                        documents: &["Formulaire IMM 5257"],
                        duration: "1 jour",
                    },
                    StepDef {
                        title: "Biométrie",
                        description: "Prise des empreintes",
                        documents: &["Lettre d'instruction biométrique"],
                        duration: "2 semaines",
                    },
                    StepDef {
                        title: "Décision",
                        description: "Réception du passeport visé",
                        documents: &["Passeport visé"],
                        duration: "3 à 6 semaines",
                    },
                ],
            },
        ],
    },
    CountryDef {
        country: "France",
        visas: &[
            VisaDef {
                visa_type: "Visa Étudiant",
                steps: &[
                    StepDef {
                        title: "Campus France",
                        description: "Création du dossier Études en France",
                        documents: &["Relevés de notes", "Diplômes", "Lettre de motivation"],
                        duration: "2 semaines",
                    },
                    StepDef {
                        title: "Entretien Campus France",
                        description: "Entretien pédagogique",
                        documents: &["Convocation"],
                        duration: "1 semaine",
                    },
                    StepDef {
                        title: "Admission",
                        description: "Réception de l'attestation d'inscription",
                        documents: &["Attestation d'inscription"],
                        duration: "4 à 8 semaines",
                    },
                    StepDef {
                        title: "Demande de visa",
                        description: "Dépôt au consulat ou chez le prestataire",
                        documents: &["Passeport", "Preuve de ressources", "Justificatif de logement"],
                        duration: "1 semaine",
                    },
                    StepDef {
                        title: "Délivrance du visa",
                        description: "Réception du VLS-TS",
                        documents: &["Passeport visé"],
                        duration: "2 à 4 semaines",
                    },
                ],
            },
            VisaDef {
                visa_type: "Visa de Travail",
                steps: &[
                    StepDef {
                        title: "Offre d'emploi",
                        description: "Contrat signé avec un employeur français",
                        documents: &["Contrat de travail"],
                        duration: "Variable",
                    },
                    StepDef {
                        title: "Autorisation de travail",
                        description: "Demande déposée par l'employeur",
                        documents: &["Autorisation de travail"],
                        duration: "4 à 8 semaines",
                    },
                    StepDef {
                        title: "Demande de visa",
                        description: "Dépôt au consulat",
                        documents: &["Passeport", "Photos d'identité"],
                        duration: "1 semaine",
                    },
                    StepDef {
                        title: "Délivrance du visa",
                        description: "Réception du visa long séjour",
                        documents: &["Passeport visé"],
                        duration: "2 à 4 semaines",
                    },
                ],
            },
            VisaDef {
                visa_type: "Regroupement Familial",
                steps: &[
                    StepDef {
                        title: "Demande OFII",
                        description: "Dépôt par le membre de famille résidant en France",
                        documents: &["Titre de séjour", "Justificatifs de ressources"],
                        duration: "2 semaines",
                    },
                    StepDef {
                        title: "Enquête logement",
                        description: "Vérification des conditions de logement",
                        documents: &["Bail", "Attestation de superficie"],
                        duration: "6 semaines",
                    },
                    StepDef {
                        title: "Décision préfectorale",
                        description: "Autorisation de regroupement",
                        documents: &["Décision préfectorale"],
                        duration: "6 mois",
                    },
                    StepDef {
                        title: "Visa",
                        description: "Demande de visa pour les bénéficiaires",
                        documents: &["Actes d'état civil", "Passeport"],
                        duration: "4 semaines",
                    },
                ],
            },
        ],
    },
    CountryDef {
        country: "Belgique",
        visas: &[VisaDef {
            visa_type: "Visa Étudiant",
            steps: &[
                StepDef {
                    title: "Inscription",
                    description: "Admission dans un établissement belge",
                    documents: &["Attestation d'inscription"],
                    duration: "4 à 8 semaines",
                },
                StepDef {
                    title: "Prise en charge",
                    description: "Garant ou preuve de ressources",
                    documents: &["Annexe 32", "Relevés bancaires"],
                    duration: "2 semaines",
                },
                StepDef {
                    title: "Demande de visa",
                    description: "Dépôt auprès de l'ambassade",
                    documents: &["Passeport", "Certificat médical", "Extrait de casier judiciaire"],
                    duration: "1 semaine",
                },
                StepDef {
                    title: "Décision",
                    description: "Réception du visa D",
                    documents: &["Passeport visé"],
                    duration: "4 à 8 semaines",
                },
            ],
        }],
    },
    CountryDef {
        country: "Portugal",
        visas: &[VisaDef {
            visa_type: "Visa de Travail",
            steps: &[
                StepDef {
                    title: "Contrat de travail",
                    description: "Promesse ou contrat avec un employeur portugais",
                    documents: &["Contrat de travail"],
                    duration: "Variable",
                },
                StepDef {
                    title: "NIF",
                    description: "Obtention du numéro fiscal",
                    documents: &["NIF"],
                    duration: "1 semaine",
                },
                StepDef {
                    title: "Demande de visa",
                    description: "Dépôt au consulat",
                    documents: &["Passeport", "Casier judiciaire", "Assurance voyage"],
                    duration: "1 semaine",
                },
                StepDef {
                    title: "Décision",
                    description: "Réception du visa de séjour",
                    documents: &["Passeport visé"],
                    duration: "4 à 8 semaines",
                },
            ],
        }],
    },
    CountryDef {
        country: "Allemagne",
        visas: &[VisaDef {
            visa_type: "Visa Étudiant",
            steps: &[
                StepDef {
                    title: "Admission",
                    description: "Zulassung d'une université allemande",
                    documents: &["Zulassungsbescheid"],
                    duration: "6 semaines",
                },
                StepDef {
                    title: "Compte bloqué",
                    description: "Ouverture du Sperrkonto",
                    documents: &["Attestation de compte bloqué"],
                    duration: "2 semaines",
                },
                StepDef {
                    title: "Rendez-vous consulaire",
                    description: "Entretien et dépôt du dossier",
                    documents: &["Passeport", "Assurance santé"],
                    duration: "4 semaines",
                },
                StepDef {
                    title: "Décision",
                    description: "Réception du visa national",
                    documents: &["Passeport visé"],
                    duration: "6 à 12 semaines",
                },
            ],
        }],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canada_work_permit_has_ten_ordered_steps() {
        let steps = catalog_steps("Canada", "Work Permit").expect("template");
        assert_eq!(steps.len(), 10);
        assert_eq!(steps[0].title, "Évaluation du profil");
        assert_eq!(steps[3].title, "EIMT");
        assert_eq!(steps[9].title, "Décision et visa");
    }

    #[test]
    fn lookup_ignores_case_and_accents() {
        let a = catalog_steps("canada", "permis de travail").expect("template");
        let b = catalog_steps("CANADA", "Permis de Travail").expect("template");
        assert_eq!(a, b);

        assert!(catalog_steps("France", "visa etudiant").is_some());
        assert!(catalog_steps("Belgium", "Student Visa").is_some());
        assert!(catalog_steps("Germany", "student visa").is_some());
    }

    #[test]
    fn decomposed_labels_resolve_like_composed_ones() {
        let composed = catalog_steps("France", "Visa Étudiant").expect("template");
        let decomposed = catalog_steps("France", "Visa E\u{301}tudiant").expect("template");
        assert_eq!(composed, decomposed);

        assert_eq!(normalize_key("Re\u{301}sidence  Permanente"), "residence permanente");
        assert_eq!(normalize_key("Permis d’études"), "permis d'etudes");
        assert!(catalog_steps("Canada", "Permis d\u{2019}e\u{301}tudes").is_some());
    }

    #[test]
    fn english_labels_map_to_catalog_labels() {
        assert_eq!(canonical_visa_type("Work Permit"), "Permis de travail");
        assert_eq!(canonical_visa_type("  family   reunification "), "Regroupement Familial");
        assert_eq!(canonical_visa_type("Golden Visa"), "Golden Visa");
        assert_eq!(canonical_country("belgium"), "Belgique");
    }

    #[test]
    fn unknown_pair_yields_no_template() {
        assert!(catalog_steps("Japon", "Work Permit").is_none());
        assert!(catalog_steps("Canada", "Visa Diplomatique").is_none());
    }
}
