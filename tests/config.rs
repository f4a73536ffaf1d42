use assert_matches::assert_matches;

use kira_resolver::config::{ConfigLoader, RESOLVER_CGI_KEY, USER_ROOT_KEY};
use kira_resolver::domain::App;
use kira_resolver::error::KiraError;
use kira_resolver::names::NamesHttpClient;
use kira_resolver::repository::RepositoryHierarchy;

#[test]
fn load_settings_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("user-settings.json");
    std::fs::write(
        &path,
        r#"{
            "repository/user/main/public": {
                "root": "/data/ncbi/public",
                "apps": { "sra": { "volumes": { "sraFlat": "sra" } } }
            },
            "repository/remote/main/SDL.2/resolver-cgi": "https://names.example.org/sdl/2/retrieve"
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(config.read(USER_ROOT_KEY), Some("/data/ncbi/public"));

    let hierarchy = RepositoryHierarchy::from_config(&config, "/work");
    assert_eq!(hierarchy.repositories().len(), 1);
    assert_eq!(hierarchy.repositories()[0].volumes(App::Sra), ["sra"]);

    let client = NamesHttpClient::from_config(&config).unwrap().unwrap();
    assert_eq!(
        client.endpoint(),
        config.read(RESOLVER_CGI_KEY).unwrap()
    );
}

#[test]
fn missing_explicit_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(KiraError::ConfigRead(_))
    );
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(KiraError::ConfigParse(_))
    );
}
