use std::io::Write;
use std::time::Duration;

use kulooc_firebase::{
    ApiStatus, FirebaseError, IndexAdminClient, IndexBuild, IndexDescriptor, IndexOrder,
};

use crate::cli::DeployIndexesArgs;
use crate::client::{AppContext, CliResult};
use crate::output::emit;

const REQUIRED_ROLE: &str = "Cloud Datastore Index Admin";

/// Composite indexes required by the dispatch service and the rides history.
fn declared_indexes() -> Vec<IndexDescriptor> {
    vec![
        IndexDescriptor::new(
            "ride_requests",
            &[
                ("status", IndexOrder::Ascending),
                ("requestedAt", IndexOrder::Ascending),
            ],
        ),
        IndexDescriptor::new(
            "rides",
            &[
                ("clientId", IndexOrder::Ascending),
                ("createdAt", IndexOrder::Descending),
            ],
        ),
        IndexDescriptor::new(
            "rides",
            &[
                ("driverId", IndexOrder::Ascending),
                ("createdAt", IndexOrder::Descending),
            ],
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum IndexOutcome {
    Created,
    AlreadyExists,
    Pending,
    PermissionDenied,
    Failed(String),
}

impl IndexOutcome {
    const fn is_failure(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::Failed(_))
    }

    fn from_error(err: &FirebaseError) -> Self {
        match err.api_status() {
            Some(ApiStatus::AlreadyExists) => Self::AlreadyExists,
            Some(ApiStatus::PermissionDenied) => Self::PermissionDenied,
            _ => Self::Failed(err.to_string()),
        }
    }
}

pub(crate) async fn handle_deploy_indexes(
    ctx: &AppContext,
    args: DeployIndexesArgs,
    out: &mut (dyn Write + Send),
) -> CliResult<()> {
    let client = ctx.session.index_admin();
    let project_id = ctx.session.project_id();
    let wait = Duration::from_secs(args.wait_secs);

    emit(out, "🚀 Déploiement des index Firestore...")?;
    emit(out, format!("📦 Projet: {project_id}"))?;

    let mut failures = 0_usize;
    for index in declared_indexes() {
        emit(out, format!("\n📝 Création de l'index: {index}"))?;
        let outcome = deploy_index(&client, &index, wait).await;
        tracing::info!(index = %index, outcome = ?outcome, "index deployment");
        render_outcome(out, &outcome)?;
        if outcome.is_failure() {
            failures += 1;
        }
    }

    emit(out, "\n✅ Déploiement des index terminé!")?;
    emit(
        out,
        "\nℹ️  Si les index sont en cours de création, ils seront prêts dans 1-5 minutes.",
    )?;
    emit(out, "   Vous pouvez vérifier leur statut sur:")?;
    emit(
        out,
        format!("   https://console.firebase.google.com/project/{project_id}/firestore/indexes"),
    )?;

    if failures > 0 {
        tracing::warn!(failures, "some indexes were not created");
    }
    Ok(())
}

async fn deploy_index(
    client: &IndexAdminClient,
    index: &IndexDescriptor,
    wait: Duration,
) -> IndexOutcome {
    let operation = match client.create_index(index).await {
        Ok(operation) => operation,
        Err(err) => return IndexOutcome::from_error(&err),
    };
    match client.wait_for(operation, wait).await {
        Ok(IndexBuild::Ready) => IndexOutcome::Created,
        Ok(IndexBuild::InProgress { .. }) => IndexOutcome::Pending,
        Err(err) => IndexOutcome::from_error(&err),
    }
}

fn render_outcome(out: &mut dyn Write, outcome: &IndexOutcome) -> CliResult<()> {
    match outcome {
        IndexOutcome::Created => emit(out, "   ✅ Index créé avec succès!"),
        IndexOutcome::AlreadyExists => emit(out, "   ℹ️  Index déjà existant (ignoré)"),
        IndexOutcome::Pending => {
            emit(out, "   ⏳ Index en cours de création en arrière-plan...")?;
            emit(
                out,
                "   ℹ️  Vous pouvez continuer, l'index sera prêt dans quelques minutes",
            )
        }
        IndexOutcome::PermissionDenied => {
            emit(out, "   ❌ Erreur de permissions")?;
            emit(
                out,
                "   ℹ️  Veuillez vérifier que le compte de service a les permissions nécessaires",
            )?;
            emit(out, format!("   ℹ️  Rôle requis: {REQUIRED_ROLE}"))
        }
        IndexOutcome::Failed(message) => {
            emit(out, format!("   ⚠️  Erreur: {message}"))?;
            emit(
                out,
                "   ℹ️  L'index peut être créé manuellement via la console Firebase",
            )
        }
    }
}
