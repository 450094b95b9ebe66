pub mod account;
pub mod directory;
pub mod file;
pub mod log;
pub mod repository;
pub mod session;
pub mod user;
pub mod verification_token;

pub use account::{Account, AccountField, AccountUnique, CreateAccount, UpdateAccount};
pub use directory::{CreateDirectory, Directory, DirectoryField, DirectoryUnique, UpdateDirectory};
pub use file::{CreateFile, File, FileField, FileUnique, UpdateFile};
pub use log::{CreateLog, Log, LogField, LogUnique, UpdateLog};
pub use repository::{CreateRepository, Repository, RepositoryField, RepositoryUnique, UpdateRepository};
pub use session::{CreateSession, Session, SessionField, SessionUnique, UpdateSession};
pub use user::{CreateUser, UpdateUser, User, UserField, UserUnique};
pub use verification_token::{
    CreateVerificationToken, UpdateVerificationToken, VerificationToken, VerificationTokenField,
    VerificationTokenUnique,
};
