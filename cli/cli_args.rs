use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Concatenate a project's source files into one text file.",
    long_about = "codexport selects project files according to per-stack rules (extensions, \nexcluded directories, signature files) and writes them into a single annotated \ntext file. Run without a command for the interactive menu.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  codexport\n  codexport export --stack 'Python (Django)' --path ./shop -o shop.txt\n  codexport discover --save\n  codexport stacks list"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        value_name = "CONFIG_FILE",
        help = "Path of the JSON config file (default: ~/.code_export_configs.json)."
    )]
    pub config: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "LOG_FILE",
        help = "Write log records to this file instead of stderr."
    )]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(visible_alias = "m", about = "Open the interactive menu [default].")]
    Menu,

    #[command(visible_alias = "e", about = "Export a project's files into one text file.")]
    Export(ExportArgs),

    #[command(visible_alias = "t", about = "Preview the files a stack would pick up.")]
    Tree(TreeArgs),

    #[command(about = "Report which stack a directory belongs to.")]
    Detect(DetectArgs),

    #[command(
        visible_alias = "d",
        about = "Search the scan directories for unregistered projects."
    )]
    Discover(DiscoverArgs),

    #[command(visible_alias = "s", about = "List, create and edit stacks and their projects.")]
    Stacks(StacksArgs),

    #[command(about = "Show or replace the scan directories.")]
    ScanDirs(ScanDirsArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ProjectOpts {
    #[arg(
        long,
        value_name = "STACK",
        help = "Stack whose rules apply (default: detected from the project).",
        help_heading = "Project Setup"
    )]
    pub stack: Option<String>,

    #[arg(
        long,
        value_name = "NAME",
        conflicts_with = "path",
        help = "Registered project name within the stack.",
        help_heading = "Project Setup"
    )]
    pub project: Option<String>,

    #[arg(
        long,
        value_name = "DIR",
        conflicts_with = "project",
        help = "Project directory (default: current dir).",
        help_heading = "Project Setup"
    )]
    pub path: Option<PathBuf>,

    #[arg(
        long,
        value_name = "N",
        help = "Deepest directory level to include (0 = project root only).",
        help_heading = "Filtering"
    )]
    pub max_depth: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,

    #[arg(
        long = "select",
        value_name = "REL_PATH",
        action = clap::ArgAction::Append,
        help = "Export only this file or directory (relative to the project). Repeatable.",
        help_heading = "Filtering"
    )]
    pub select: Vec<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Output file [default: exported_code.txt].",
        help_heading = "Output Control"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        value_name = "N",
        help = "Truncate files to this many lines [default: 1000].",
        help_heading = "Output Control"
    )]
    pub max_lines: Option<usize>,

    #[arg(
        long,
        value_name = "BYTES",
        help = "Skip files larger than this [default: 1000000].",
        help_heading = "Output Control"
    )]
    pub max_file_size: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    #[clap(flatten)]
    pub project: ProjectOpts,

    #[arg(long, help = "Print the tree as JSON.")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    #[arg(value_name = "DIR", help = "Directory to inspect (default: current dir).")]
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    #[arg(
        long,
        value_name = "N",
        default_value_t = codexport_core::DEFAULT_DISCOVERY_DEPTH,
        help = "How many directory levels below each scan root to search."
    )]
    pub depth: usize,

    #[arg(long, help = "Register the discovered projects in the config file.")]
    pub save: bool,

    #[arg(long, help = "Print the result as JSON.")]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StacksArgs {
    #[command(subcommand)]
    pub action: StacksAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum StacksAction {
    #[command(visible_alias = "ls", about = "List stacks in detection order.")]
    List {
        #[arg(long, help = "Print the stacks as JSON.")]
        json: bool,
    },
    #[command(about = "Show one stack with its projects.")]
    Show { name: String },
    #[command(about = "Create a stack (appended, lowest detection priority).")]
    Create {
        name: String,
        #[clap(flatten)]
        lists: StackLists,
    },
    #[command(about = "Replace lists of an existing stack; omitted lists are kept.")]
    Edit {
        name: String,
        #[clap(flatten)]
        lists: StackLists,
    },
    #[command(about = "Register a project directory under a stack.")]
    AddProject {
        stack: String,
        name: String,
        path: PathBuf,
        #[arg(long, help = "Add even if the directory does not look like this stack.")]
        force: bool,
    },
    #[command(about = "Remove a registered project from a stack.")]
    RemoveProject { stack: String, name: String },
}

#[derive(Args, Debug, Clone, Default)]
pub struct StackLists {
    #[arg(long = "ext", value_name = "SUFFIX", num_args = 1.., help = "File extensions, e.g. .py .html")]
    pub extensions: Vec<String>,
    #[arg(long = "exclude", value_name = "DIR", num_args = 1.., help = "Directory names to skip.")]
    pub exclude_dirs: Vec<String>,
    #[arg(long = "signature", value_name = "FILE", num_args = 1.., help = "Files identifying the stack.")]
    pub signature_files: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ScanDirsArgs {
    #[arg(value_name = "DIR", help = "New scan directories. Without arguments the current list is shown.")]
    pub dirs: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}
