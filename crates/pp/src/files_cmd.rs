//! `pp files` subcommands: browse and delete saved result files.

use anyhow::Result;
use clap::Subcommand;
use pp_core::{
    domain::Caller,
    service::CollectionService,
    store::{ListQuery, SortOrder, DEFAULT_LIST_LIMIT},
};

use crate::output;

#[derive(Subcommand)]
pub enum FileCommands {
    /// List saved result files
    List {
        #[arg(long, default_value_t = 0)]
        skip: usize,
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
        /// date_asc, date_desc, name_asc or name_desc
        #[arg(long, default_value = "date_desc")]
        sort: String,
    },
    /// Show one page of a saved file
    View {
        id: u64,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Delete a saved file and its data
    Delete { id: u64 },
}

pub async fn run(service: &CollectionService, caller: &Caller, cmd: FileCommands) -> Result<()> {
    match cmd {
        FileCommands::List { skip, limit, sort } => {
            let sort: SortOrder = sort.parse()?;
            let files = service
                .list_files(caller, ListQuery { skip, limit, sort })
                .await?;
            print!("{}", output::file_list(&files));
        }
        FileCommands::View { id, page } => {
            let view = service.view_file(caller, id, page).await?;
            print!("{}", output::file_view(&view));
        }
        FileCommands::Delete { id } => {
            let removed = service.delete_file(caller, id).await?;
            println!("Deleted #{} {}", removed.id, removed.filename);
        }
    }
    Ok(())
}
