use std::io::Write;

use anyhow::Context;
use kulooc_firebase::{FIRESTORE_RELEASE, ReleaseOutcome};

use crate::cli::DeployRulesArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{emit, render_json};

/// Name under which the source is stored in the ruleset.
const RULES_FILE_NAME: &str = "firestore.rules";

pub(crate) async fn handle_deploy_rules(
    ctx: &AppContext,
    args: DeployRulesArgs,
    out: &mut (dyn Write + Send),
) -> CliResult<()> {
    let content = std::fs::read_to_string(&args.rules_file)
        .with_context(|| format!("impossible de lire {}", args.rules_file.display()))
        .map_err(CliError::failure)?;

    let rules = ctx.session.rules();
    emit(
        out,
        format!("Création du ruleset pour le projet {}...", ctx.session.project_id()),
    )?;
    let ruleset = rules
        .create_ruleset(RULES_FILE_NAME, &content)
        .await
        .map_err(|err| {
            CliError::failure(anyhow::Error::new(err).context("échec de la création du ruleset"))
        })?;
    emit(out, format!("✅ Ruleset créé: {}", ruleset.name))?;

    emit(out, "Création de la release...")?;
    let outcome = rules
        .publish(FIRESTORE_RELEASE, &ruleset.name)
        .await
        .map_err(|err| {
            CliError::failure(anyhow::Error::new(err).context("échec de la création de la release"))
        })?;
    if matches!(outcome, ReleaseOutcome::Updated(_)) {
        emit(out, "ℹ️  Release existante mise à jour")?;
    }
    emit(out, "✅ Règles Firestore déployées avec succès!")?;
    render_json(out, outcome.release())
}
