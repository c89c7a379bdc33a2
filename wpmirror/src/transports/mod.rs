pub mod cpanel;
pub mod ftp;
pub mod sftp;
