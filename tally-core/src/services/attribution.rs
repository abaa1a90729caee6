//! Company attribution for uploads

use crate::domain::{Attribution, CompanyId, FileFailure, Uploader};
use crate::ports::IdentityDirectory;

/// Decide which company a batch belongs to.
///
/// Managers and analysts work across companies, so they always have to name
/// one. A client may omit it only when the directory gives them exactly one
/// company. There is no fallback company.
pub fn resolve_attribution(
    uploader: &Uploader,
    requested: Option<CompanyId>,
    directory: &dyn IdentityDirectory,
) -> Result<Attribution, FileFailure> {
    let companies = directory
        .resolve_companies_for(&uploader.id)
        .map_err(|e| FileFailure::MissingAttribution {
            uploaded_by: uploader.id.clone(),
            reason: format!("identity lookup failed: {}", e),
        })?;

    let company_id = match requested {
        Some(company_id) => {
            if !companies.contains(&company_id) {
                return Err(FileFailure::CompanyNotAccessible {
                    uploaded_by: uploader.id.clone(),
                    company_id,
                });
            }
            company_id
        }
        None if uploader.role.acts_across_companies() => {
            return Err(FileFailure::MissingAttribution {
                uploaded_by: uploader.id.clone(),
                reason: "role works across companies, pass the company explicitly".to_string(),
            });
        }
        None => {
            let mut iter = companies.iter();
            match (iter.next(), iter.next()) {
                (Some(only), None) => *only,
                (None, _) => {
                    return Err(FileFailure::MissingAttribution {
                        uploaded_by: uploader.id.clone(),
                        reason: "no company is linked to this identity".to_string(),
                    });
                }
                (Some(_), Some(_)) => {
                    return Err(FileFailure::MissingAttribution {
                        uploaded_by: uploader.id.clone(),
                        reason: format!("identity belongs to {} companies", companies.len()),
                    });
                }
            }
        }
    };

    Ok(Attribution {
        company_id,
        uploaded_by: uploader.id.clone(),
    })
}
