use ak_migrate::databases::mysql::MysqlConfig;
use mysql::{Conn, Opts, prelude::Queryable};
use testcontainers::{Container, runners::SyncRunner};

use super::testable_database::TestableDatabase;

pub struct TestMysqlDatabase {
    pub uri: String,
    pub config: MysqlConfig,
    pub connection: Conn,
    container: Container<testcontainers_modules::mysql::Mysql>,
}

impl TestMysqlDatabase {
    pub fn new() -> Self {
        let container = testcontainers_modules::mysql::Mysql::default()
            .start()
            .unwrap();

        let config = MysqlConfig {
            host: container.get_host().unwrap().to_string(),
            port: container.get_host_port_ipv4(3306).unwrap(),
            user: "root".to_string(),
            password: String::new(),
            database: "test".to_string(),
        };
        let uri = format!(
            "mysql://{}@{}:{}/{}",
            config.user, config.host, config.port, config.database
        );
        let mut connection = Conn::new(Opts::from_url(&uri).unwrap()).unwrap();
        // Legacy data relies on zero dates
        connection.query_drop("SET SESSION sql_mode = ''").unwrap();

        return Self {
            uri,
            config,
            connection,
            container,
        };
    }

    /// Users, animes and their critiques, with the usual legacy oddities.
    pub fn create_catalogue(&mut self) {
        self.execute(
            "CREATE TABLE ak_users (
                id INT AUTO_INCREMENT PRIMARY KEY,
                username VARCHAR(80) NOT NULL,
                is_admin TINYINT(1) NOT NULL DEFAULT 0,
                newsletter BIT(1) NOT NULL DEFAULT b'0',
                date_inscription DATETIME NULL
            )",
        );
        self.execute(
            "CREATE TABLE ak_animes (
                id_anime INT AUTO_INCREMENT PRIMARY KEY,
                titre VARCHAR(255) NOT NULL DEFAULT '',
                nice_url VARCHAR(255) NOT NULL,
                note DECIMAL(4,2) NULL,
                statut ENUM('en cours','termine') NOT NULL DEFAULT 'en cours',
                date_ajout DATETIME NOT NULL,
                UNIQUE KEY nice_url (nice_url),
                FULLTEXT KEY recherche (titre)
            )",
        );
        self.execute(
            "CREATE TABLE ak_critique (
                id_critique INT AUTO_INCREMENT PRIMARY KEY,
                id_membre INT NOT NULL,
                id_anime INT NULL,
                titre VARCHAR(255) NULL,
                notation TINYINT NULL,
                date_critique DATETIME NULL,
                KEY id_anime (id_anime),
                CONSTRAINT fk_membre FOREIGN KEY (id_membre) REFERENCES ak_users (id)
            )",
        );
        self.execute(
            "INSERT INTO ak_users (id, username, is_admin, newsletter, date_inscription) VALUES
                (1, 'kenshin', 1, b'1', '2004-10-19 10:23:54'),
                (2, 'shinji', 0, b'0', '0000-00-00 00:00:00')",
        );
        self.execute(
            "INSERT INTO ak_animes (id_anime, titre, nice_url, note, statut, date_ajout) VALUES
                (10, 'Cowboy Bebop', 'cowboy-bebop', 9.50, 'termine', '2004-10-19 10:23:54'),
                (11, 'Monster', 'monster', NULL, 'termine', '0000-00-00 00:00:00'),
                (12, 'Mushishi', 'mushishi', 8.75, 'en cours', '2006-01-01 00:00:00')",
        );
        self.execute(
            "INSERT INTO ak_critique (id_critique, id_membre, id_anime, titre, notation, date_critique) VALUES
                (100, 1, 10, 'Chef d''oeuvre', 10, '2005-02-03 04:05:06'),
                (101, 2, 99, 'Orpheline', 4, NULL)",
        );
    }
}

impl TestableDatabase for TestMysqlDatabase {
    fn execute(&mut self, query: &str) {
        self.connection.query_drop(query).unwrap();
    }

    fn query_count(&mut self, query: &str) -> u64 {
        return self.connection.query_first(query).unwrap().unwrap();
    }
}
