//! The Dropbox parity step corpus
//!
//! One step per connector scenario, chained by explicit dependency edges
//! along each resource lifecycle: create a folder,
//! upload a file into it, read it back through every read operation, then
//! move, delete, and restore it. Steps come in a handful of shapes
//! (create-and-compare, conflict, response parity, error-presence flip) and
//! are instantiated with the fixture pair and assertions each scenario
//! needs.

use super::{ensure_eq, ensure_status, error_tag, field, string_field, Action, HarnessContext};
use crate::sequence::{Plan, PlanError, Step, StepError};
use crate::upload::FileUploader;
use async_trait::async_trait;
use std::path::Path;

/// Dropbox API endpoints the direct calls hit
pub mod endpoints {
    pub const GET_METADATA: &str = "/2/files/get_metadata";
    pub const LIST_REVISIONS: &str = "/2/files/list_revisions";
    pub const SEARCH: &str = "/2/files/search";
    pub const MOVE: &str = "/2/files/move";
    pub const DELETE: &str = "/2/files/delete";
    pub const RESTORE: &str = "/2/files/restore";
    pub const GET_SHARED_LINK_METADATA: &str = "/2/sharing/get_shared_link_metadata";
}

/// Create an entry through the proxy, fetch its metadata directly, and
/// compare ids. Used by the createFolder and copy positive scenarios.
struct CreateEntryStep {
    name: &'static str,
    priority: u8,
    depends_on: Vec<&'static str>,
    action: Action,
    esb_fixture: &'static str,
    api_fixture: &'static str,
    expected_tag: &'static str,
    /// Stash the created entry's `path_display` under this property before
    /// the direct call, so the api fixture can reference it.
    stash_path_as: Option<&'static str>,
}

#[async_trait]
impl Step<HarnessContext> for CreateEntryStep {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn depends_on(&self) -> Vec<&str> {
        self.depends_on.clone()
    }

    async fn run(&self, ctx: &HarnessContext) -> Result<(), StepError> {
        let esb = ctx.send_esb(self.action, self.esb_fixture).await?;
        if let Some(key) = self.stash_path_as {
            let path = string_field(&esb, "proxy", "path_display")?;
            ctx.properties.set(key, path);
        }

        let api = ctx.send_api(endpoints::GET_METADATA, self.api_fixture).await?;
        ensure_eq(
            "entry id",
            string_field(&esb, "proxy", "id")?,
            string_field(&api, "direct API", "id")?,
        )?;
        ensure_eq(
            "entry .tag",
            string_field(&api, "direct API", ".tag")?,
            self.expected_tag.to_string(),
        )
    }
}

/// Expect the proxy to relay a Dropbox path conflict: HTTP 409 with either a
/// specific `error..tag` or at least an `error_summary`.
struct ConflictStep {
    name: &'static str,
    priority: u8,
    depends_on: Vec<&'static str>,
    action: Action,
    esb_fixture: &'static str,
    expected_error_tag: Option<&'static str>,
}

#[async_trait]
impl Step<HarnessContext> for ConflictStep {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn depends_on(&self) -> Vec<&str> {
        self.depends_on.clone()
    }

    async fn run(&self, ctx: &HarnessContext) -> Result<(), StepError> {
        let esb = ctx.send_esb(self.action, self.esb_fixture).await?;
        ensure_status(&esb, 409)?;
        match self.expected_error_tag {
            Some(expected) => ensure_eq(
                "error tag",
                error_tag(&esb, "proxy")?,
                expected.to_string(),
            ),
            None => field(&esb, "proxy", "error_summary").map(|_| ()),
        }
    }
}

/// How a parity step compares the two responses
enum Comparison {
    /// The named top-level fields must be equal
    Fields(&'static [&'static str]),
    /// The whole parsed bodies must be equal
    WholeBody,
    /// Status codes and the named fields must be equal
    StatusAndFields(&'static [&'static str]),
}

/// Issue the same operation through the proxy and directly, then compare.
struct ParityStep {
    name: &'static str,
    priority: u8,
    depends_on: Vec<&'static str>,
    action: Action,
    esb_fixture: &'static str,
    api_endpoint: &'static str,
    api_fixture: &'static str,
    comparison: Comparison,
}

#[async_trait]
impl Step<HarnessContext> for ParityStep {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn depends_on(&self) -> Vec<&str> {
        self.depends_on.clone()
    }

    async fn run(&self, ctx: &HarnessContext) -> Result<(), StepError> {
        let esb = ctx.send_esb(self.action, self.esb_fixture).await?;
        let api = ctx.send_api(self.api_endpoint, self.api_fixture).await?;

        match self.comparison {
            Comparison::Fields(fields) => compare_fields(&esb, &api, fields),
            Comparison::WholeBody => ensure_eq("response body", esb.body(), api.body()),
            Comparison::StatusAndFields(fields) => {
                ensure_eq("status code", esb.status(), api.status())?;
                compare_fields(&esb, &api, fields)
            }
        }
    }
}

fn compare_fields(
    esb: &crate::rest::RestResponse,
    api: &crate::rest::RestResponse,
    fields: &[&str],
) -> Result<(), StepError> {
    for name in fields {
        ensure_eq(
            name,
            field(esb, "proxy", name)?,
            field(api, "direct API", name)?,
        )?;
    }
    Ok(())
}

/// Run a mutation through the proxy and verify it flips whether a direct
/// metadata fetch of the affected path reports an `error`. Move and delete
/// make the path disappear; restore brings it back.
struct PresenceFlipStep {
    name: &'static str,
    priority: u8,
    depends_on: Vec<&'static str>,
    action: Action,
    esb_fixture: &'static str,
    /// get_metadata fixture for the affected path, fetched before and after
    api_fixture: &'static str,
    /// Whether the metadata fetch errors before the mutation
    error_before: bool,
    /// Stash the mutated entry's `rev` for the restore scenario
    stash_rev: bool,
}

#[async_trait]
impl Step<HarnessContext> for PresenceFlipStep {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> u8 {
        self.priority
    }

    fn depends_on(&self) -> Vec<&str> {
        self.depends_on.clone()
    }

    async fn run(&self, ctx: &HarnessContext) -> Result<(), StepError> {
        let before = ctx.send_api(endpoints::GET_METADATA, self.api_fixture).await?;
        let esb = ctx.send_esb(self.action, self.esb_fixture).await?;
        if self.stash_rev {
            let rev = string_field(&esb, "proxy", "rev")?;
            ctx.properties.set("rev", rev);
        }
        let after = ctx.send_api(endpoints::GET_METADATA, self.api_fixture).await?;

        ensure_eq("error before mutation", before.has("error"), self.error_before)?;
        ensure_eq("error after mutation", after.has("error"), !self.error_before)
    }
}

/// Upload the configured file through the proxy's uploadFile action.
struct UploadFileStep {
    depends_on: Vec<&'static str>,
}

#[async_trait]
impl Step<HarnessContext> for UploadFileStep {
    fn name(&self) -> &str {
        "upload_file"
    }

    fn priority(&self) -> u8 {
        1
    }

    fn depends_on(&self) -> Vec<&str> {
        self.depends_on.clone()
    }

    async fn run(&self, ctx: &HarnessContext) -> Result<(), StepError> {
        let url = FileUploader::build_url(&ctx.config, &ctx.properties)?;
        let mut headers = ctx.esb_headers(Action::UploadFile);
        headers.insert(
            "Content-Type".to_string(),
            "application/octet-stream".to_string(),
        );

        let source = ctx.properties.require("upload_source_path")?;
        let esb = ctx
            .uploader
            .upload_file(&url, &headers, Path::new(&source))
            .await?;

        ensure_status(&esb, 200)?;
        field(&esb, "proxy", "id").map(|_| ())
    }
}

/// Request a temporary link through the proxy and check its shape.
struct TemporaryLinkStep {
    depends_on: Vec<&'static str>,
}

#[async_trait]
impl Step<HarnessContext> for TemporaryLinkStep {
    fn name(&self) -> &str {
        "get_temporary_link_mandatory"
    }

    fn priority(&self) -> u8 {
        2
    }

    fn depends_on(&self) -> Vec<&str> {
        self.depends_on.clone()
    }

    async fn run(&self, ctx: &HarnessContext) -> Result<(), StepError> {
        let esb = ctx
            .send_esb(Action::GetTemporaryLink, "esb_getTemporaryLink_mandatory")
            .await?;
        ensure_status(&esb, 200)?;
        field(&esb, "proxy", "link").map(|_| ())
    }
}

/// Create a shared link through the proxy, fetch its metadata directly via
/// the stashed URL, and compare.
struct SharedLinkStep {
    name: &'static str,
    depends_on: Vec<&'static str>,
    esb_fixture: &'static str,
    /// Stash the direct response's `rev`
    stash_rev: bool,
}

#[async_trait]
impl Step<HarnessContext> for SharedLinkStep {
    fn name(&self) -> &str {
        self.name
    }

    fn priority(&self) -> u8 {
        1
    }

    fn depends_on(&self) -> Vec<&str> {
        self.depends_on.clone()
    }

    async fn run(&self, ctx: &HarnessContext) -> Result<(), StepError> {
        let esb = ctx
            .send_esb(Action::CreateSharedLinkWithSettings, self.esb_fixture)
            .await?;
        let shared_url = string_field(&esb, "proxy", "url")?;
        ctx.properties.set("shared_url", shared_url);

        let api = ctx
            .send_api(
                endpoints::GET_SHARED_LINK_METADATA,
                "api_createSharedLinkWithSettings_mandatory",
            )
            .await?;
        if self.stash_rev {
            let rev = string_field(&api, "direct API", "rev")?;
            ctx.properties.set("rev", rev);
        }

        ensure_eq(
            "shared link url",
            string_field(&esb, "proxy", "url")?,
            string_field(&api, "direct API", "url")?,
        )
    }
}

/// Build the full parity plan: every scenario with its priority and
/// dependency edges.
pub fn parity_plan() -> Result<Plan<HarnessContext>, PlanError> {
    let steps: Vec<Box<dyn Step<HarnessContext>>> = vec![
        Box::new(CreateEntryStep {
            name: "create_folder_mandatory",
            priority: 2,
            depends_on: vec![],
            action: Action::CreateFolder,
            esb_fixture: "esb_createFolder_mandatory",
            api_fixture: "api_createFolder_mandatory",
            expected_tag: "folder",
            stash_path_as: None,
        }),
        Box::new(CreateEntryStep {
            name: "create_folder_optional",
            priority: 2,
            depends_on: vec!["create_folder_mandatory"],
            action: Action::CreateFolder,
            esb_fixture: "esb_createFolder_optional",
            api_fixture: "api_createFolder_optional",
            expected_tag: "folder",
            stash_path_as: Some("optional_path"),
        }),
        Box::new(ConflictStep {
            name: "create_folder_negative",
            priority: 2,
            depends_on: vec!["create_folder_optional"],
            action: Action::CreateFolder,
            esb_fixture: "esb_createFolder_negative",
            expected_error_tag: Some("path"),
        }),
        Box::new(UploadFileStep {
            depends_on: vec!["create_folder_negative"],
        }),
        Box::new(TemporaryLinkStep {
            depends_on: vec!["upload_file"],
        }),
        Box::new(ConflictStep {
            name: "get_temporary_link_negative",
            priority: 2,
            depends_on: vec!["get_temporary_link_mandatory"],
            action: Action::GetTemporaryLink,
            esb_fixture: "esb_getTemporaryLink_negative",
            expected_error_tag: Some("path"),
        }),
        Box::new(CreateEntryStep {
            name: "copy_mandatory",
            priority: 2,
            depends_on: vec!["upload_file"],
            action: Action::Copy,
            esb_fixture: "esb_copy_mandatory",
            api_fixture: "api_copy_mandatory",
            expected_tag: "file",
            stash_path_as: None,
        }),
        Box::new(CreateEntryStep {
            name: "copy_optional",
            priority: 2,
            depends_on: vec!["copy_mandatory"],
            action: Action::Copy,
            esb_fixture: "esb_copy_optional",
            api_fixture: "api_copy_optional",
            expected_tag: "file",
            stash_path_as: Some("optional_file_path"),
        }),
        Box::new(ConflictStep {
            name: "copy_negative",
            priority: 2,
            depends_on: vec!["copy_optional"],
            action: Action::Copy,
            esb_fixture: "esb_copy_negative",
            expected_error_tag: Some("to"),
        }),
        Box::new(ParityStep {
            name: "get_metadata_mandatory",
            priority: 1,
            depends_on: vec!["upload_file"],
            action: Action::GetMetadata,
            esb_fixture: "esb_getMetadata_mandatory",
            api_endpoint: endpoints::GET_METADATA,
            api_fixture: "api_getMetadata_mandatory",
            comparison: Comparison::Fields(&[".tag", "name", "id"]),
        }),
        Box::new(ParityStep {
            name: "get_metadata_optional",
            priority: 1,
            depends_on: vec!["get_metadata_mandatory"],
            action: Action::GetMetadata,
            esb_fixture: "esb_getMetadata_optional",
            api_endpoint: endpoints::GET_METADATA,
            api_fixture: "api_getMetadata_optional",
            comparison: Comparison::WholeBody,
        }),
        Box::new(ParityStep {
            name: "get_metadata_negative",
            priority: 1,
            depends_on: vec!["get_metadata_optional"],
            action: Action::GetMetadata,
            esb_fixture: "esb_getMetadata_negative",
            api_endpoint: endpoints::GET_METADATA,
            api_fixture: "api_getMetadata_negative",
            comparison: Comparison::Fields(&["error"]),
        }),
        Box::new(SharedLinkStep {
            name: "create_shared_link_mandatory",
            depends_on: vec!["get_metadata_negative"],
            esb_fixture: "esb_createSharedLinkWithSettings_mandatory",
            stash_rev: true,
        }),
        Box::new(SharedLinkStep {
            name: "create_shared_link_optional",
            depends_on: vec!["create_shared_link_mandatory"],
            esb_fixture: "esb_createSharedLinkWithSettings_optional",
            stash_rev: false,
        }),
        Box::new(ConflictStep {
            name: "create_shared_link_negative",
            priority: 1,
            depends_on: vec!["create_shared_link_optional"],
            action: Action::CreateSharedLinkWithSettings,
            esb_fixture: "esb_createSharedLinkWithSettings_negative",
            expected_error_tag: None,
        }),
        Box::new(ParityStep {
            name: "list_revisions_mandatory",
            priority: 1,
            depends_on: vec!["create_shared_link_mandatory"],
            action: Action::ListRevisions,
            esb_fixture: "esb_listRevisions_mandatory",
            api_endpoint: endpoints::LIST_REVISIONS,
            api_fixture: "api_listRevisions_mandatory",
            comparison: Comparison::WholeBody,
        }),
        Box::new(ParityStep {
            name: "list_revisions_optional",
            priority: 1,
            depends_on: vec!["list_revisions_mandatory"],
            action: Action::ListRevisions,
            esb_fixture: "esb_listRevisions_optional",
            api_endpoint: endpoints::LIST_REVISIONS,
            api_fixture: "api_listRevisions_optional",
            comparison: Comparison::WholeBody,
        }),
        Box::new(ParityStep {
            name: "list_revisions_negative",
            priority: 1,
            depends_on: vec!["list_revisions_optional"],
            action: Action::ListRevisions,
            esb_fixture: "esb_listRevisions_negative",
            api_endpoint: endpoints::LIST_REVISIONS,
            api_fixture: "api_listRevisions_negative",
            comparison: Comparison::Fields(&["error"]),
        }),
        Box::new(ParityStep {
            name: "search_mandatory",
            priority: 1,
            depends_on: vec!["list_revisions_optional"],
            action: Action::Search,
            esb_fixture: "esb_search_mandatory",
            api_endpoint: endpoints::SEARCH,
            api_fixture: "api_search_mandatory",
            comparison: Comparison::WholeBody,
        }),
        Box::new(ParityStep {
            name: "search_optional",
            priority: 1,
            depends_on: vec!["search_mandatory"],
            action: Action::Search,
            esb_fixture: "esb_search_optional",
            api_endpoint: endpoints::SEARCH,
            api_fixture: "api_search_optional",
            comparison: Comparison::WholeBody,
        }),
        Box::new(ParityStep {
            name: "search_negative",
            priority: 1,
            depends_on: vec!["search_optional"],
            action: Action::Search,
            esb_fixture: "esb_search_negative",
            api_endpoint: endpoints::SEARCH,
            api_fixture: "api_search_negative",
            comparison: Comparison::Fields(&["error"]),
        }),
        Box::new(PresenceFlipStep {
            name: "move_mandatory",
            priority: 2,
            depends_on: vec!["search_optional"],
            action: Action::Move,
            esb_fixture: "esb_move_mandatory",
            api_fixture: "api_move_mandatory",
            error_before: false,
            stash_rev: false,
        }),
        Box::new(PresenceFlipStep {
            name: "move_optional",
            priority: 2,
            depends_on: vec!["move_mandatory"],
            action: Action::Move,
            esb_fixture: "esb_move_optional",
            api_fixture: "api_move_optional",
            error_before: false,
            stash_rev: false,
        }),
        Box::new(ParityStep {
            name: "move_negative",
            priority: 2,
            depends_on: vec!["move_optional"],
            action: Action::Move,
            // The source was already moved away, so replaying the optional
            // move yields the same lookup error the direct call reports.
            esb_fixture: "esb_move_optional",
            api_endpoint: endpoints::MOVE,
            api_fixture: "api_move_negative",
            comparison: Comparison::Fields(&["error"]),
        }),
        Box::new(PresenceFlipStep {
            name: "delete_mandatory",
            priority: 2,
            depends_on: vec!["move_optional"],
            action: Action::Delete,
            esb_fixture: "esb_delete_mandatory",
            api_fixture: "api_delete_mandatory",
            error_before: false,
            stash_rev: true,
        }),
        Box::new(ParityStep {
            name: "delete_negative",
            priority: 2,
            depends_on: vec!["delete_mandatory"],
            action: Action::Delete,
            esb_fixture: "esb_delete_negative",
            api_endpoint: endpoints::DELETE,
            api_fixture: "api_delete_negative",
            comparison: Comparison::StatusAndFields(&["error"]),
        }),
        Box::new(PresenceFlipStep {
            name: "restore_file_mandatory",
            priority: 1,
            depends_on: vec!["delete_mandatory"],
            action: Action::RestoreFile,
            esb_fixture: "esb_restoreFile_mandatory",
            api_fixture: "api_delete_mandatory",
            error_before: true,
            stash_rev: false,
        }),
        Box::new(ParityStep {
            name: "restore_file_negative",
            priority: 1,
            depends_on: vec!["restore_file_mandatory"],
            action: Action::RestoreFile,
            esb_fixture: "esb_restoreFile_negative",
            api_endpoint: endpoints::RESTORE,
            api_fixture: "api_restoreFile_negative",
            comparison: Comparison::WholeBody,
        }),
    ];

    Plan::new(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parity_plan_builds() {
        let plan = parity_plan().unwrap();
        assert_eq!(plan.execution_order().len(), 28);
    }

    #[test]
    fn test_plan_respects_lifecycle_edges() {
        let plan = parity_plan().unwrap();
        let order = plan.execution_order();
        let position = |name: &str| order.iter().position(|&n| n == name).unwrap();

        // The folder exists before anything is uploaded into it
        assert!(position("create_folder_mandatory") < position("upload_file"));
        // Reads happen between upload and the destructive tail
        assert!(position("upload_file") < position("get_metadata_mandatory"));
        assert!(position("search_optional") < position("move_mandatory"));
        // Restore runs only after delete stashed the revision
        assert!(position("delete_mandatory") < position("restore_file_mandatory"));
    }

    #[test]
    fn test_plan_priority_orders_reads_before_folder_tail() {
        let plan = parity_plan().unwrap();
        let order = plan.execution_order();
        let position = |name: &str| order.iter().position(|&n| n == name).unwrap();

        // Both depend on upload_file; the priority-1 metadata read wins
        assert!(position("get_metadata_mandatory") < position("copy_mandatory"));
    }
}
