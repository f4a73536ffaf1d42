mod common;

use assert_matches::assert_matches;

use kira_resolver::config::{AD_CACHING_KEY, ConfigStore, USER_ROOT_KEY};
use kira_resolver::error::{KiraError, LocationError};
use kira_resolver::path::VirtualPath;
use kira_resolver::repository::{RepositoryHierarchy, Tier};
use kira_resolver::resolver::Resolver;
use kira_resolver::response::RemoteStatus;
use kira_resolver::service::ServiceRequest;

use common::{ACC, MockNames, touch, workdir};

fn user_repo_config(root: &str) -> ConfigStore {
    let mut config = ConfigStore::new();
    config.write(USER_ROOT_KEY, root);
    config.write(
        "/repository/user/main/public/apps/sra/volumes/sraFlat",
        "sra",
    );
    config
}

fn request_for(ids: &[&str]) -> ServiceRequest {
    let mut request = ServiceRequest::new();
    for id in ids {
        request.add_id(id).unwrap();
    }
    request
}

#[test]
fn add_id_rejects_empty_and_accepts_repeats() {
    let mut request = ServiceRequest::new();
    assert_matches!(request.add_id(""), Err(KiraError::InvalidArgument(_)));
    for _ in 0..1025 {
        request.add_id("0").unwrap();
    }
    assert_eq!(request.len(), 1025);
}

#[test]
fn get_location_argument_checks_and_mismatches() {
    let (_temp, dir) = workdir();
    let resolver = Resolver::new(RepositoryHierarchy::new(dir), MockNames::knowing(&[ACC]));
    let mut request = request_for(&[ACC]);
    request.set_resolution_mode(false, true);
    request.set_format("all");
    let response = request.execute(&resolver).unwrap();

    assert_matches!(
        response.get_location("", "", ""),
        Err(KiraError::InvalidArgument(_))
    );
    assert_matches!(
        response.get_location(ACC, "", ""),
        Err(KiraError::InvalidArgument(_))
    );
    assert_matches!(
        response.get_location("", ACC, ""),
        Err(KiraError::InvalidArgument(_))
    );

    let location = response.get_location(ACC, ACC, "sra").unwrap();
    assert_eq!(location.local, Err(LocationError::NotFound));
    assert_eq!(location.remote.len(), 1);

    let location = response.get_location(ACC, "SRR850901.qq", "sra").unwrap();
    assert_eq!(location.local, Err(LocationError::NotFound));
    assert_eq!(location.cache, Err(LocationError::NotFound));
    assert!(location.remote.is_empty());

    let location = response.get_location("SRR000001", "SRR000001", "sra").unwrap();
    assert_eq!(location.local, Err(LocationError::NotFound));
    assert_eq!(location.cache, Err(LocationError::NotFound));

    let location = response.get_location(ACC, ACC, "wgs").unwrap();
    assert_eq!(location.local, Err(LocationError::TypeMismatch));
    assert_eq!(location.cache, Err(LocationError::TypeMismatch));
}

#[test]
fn remote_only_without_user_repository_has_no_cache() {
    let (_temp, dir) = workdir();
    let resolver = Resolver::new(RepositoryHierarchy::new(dir), MockNames::knowing(&[ACC]));
    let response = request_for(&[ACC]).execute(&resolver).unwrap();

    let location = response.get_location(ACC, ACC, "sra").unwrap();
    assert_eq!(location.local, Err(LocationError::NotFound));
    assert_eq!(location.cache, Err(LocationError::NoCacheRoot));
}

#[test]
fn local_in_accession_directory() {
    let (_temp, dir) = workdir();
    let expected = dir.join(ACC).join(format!("{ACC}.sra"));
    touch(&expected);

    let resolver = Resolver::new(RepositoryHierarchy::new(&dir), MockNames::knowing(&[ACC]));
    let mut request = request_for(&[ACC]);
    request.set_resolution_mode(false, true);
    let response = request.execute(&resolver).unwrap();

    let location = response.get_location(ACC, ACC, "sra").unwrap();
    let local = location.local.unwrap();
    assert_eq!(local.read_path().unwrap(), expected);
    assert_eq!(location.cache, Err(LocationError::NoCacheRoot));
    assert_eq!(location.remote.len(), 1);
}

#[test]
fn local_in_user_repository() {
    let (_temp, dir) = workdir();
    let expected = dir.join("tmp").join("sra").join(format!("{ACC}.sra"));
    touch(&expected);

    let hierarchy = RepositoryHierarchy::from_config(&user_repo_config("tmp"), &dir);
    let resolver = Resolver::new(hierarchy, MockNames::knowing(&[ACC]));
    let response = request_for(&[ACC]).execute(&resolver).unwrap();

    let location = response.get_location(ACC, ACC, "sra").unwrap();
    assert_eq!(location.local.unwrap().read_path().unwrap(), expected);
    assert_eq!(location.cache.unwrap().read_path().unwrap(), expected);
    assert_eq!(
        response.entry(&ACC.parse().unwrap()).unwrap().objects[0].tier,
        Some(Tier::User)
    );
}

#[test]
fn cache_in_accession_directory() {
    let (_temp, dir) = workdir();
    let expected = dir.join(ACC).join(format!("{ACC}.sra"));
    touch(&expected);

    let hierarchy = RepositoryHierarchy::new(&dir).with_ad_caching(true);
    let resolver = Resolver::new(hierarchy, MockNames::knowing(&[ACC]));
    let response = request_for(&[ACC]).execute(&resolver).unwrap();

    let location = response.get_location(ACC, ACC, "sra").unwrap();
    assert_eq!(location.local.unwrap().read_path().unwrap(), expected);
    assert_eq!(location.cache.unwrap().read_path().unwrap(), expected);
}

#[test]
fn ad_caching_keeps_user_copy_discoverable() {
    let (_temp, dir) = workdir();
    let user_copy = dir.join("tmp").join("sra").join(format!("{ACC}.sra"));
    touch(&user_copy);

    let mut config = user_repo_config("tmp");
    config.write(AD_CACHING_KEY, "true");
    let hierarchy = RepositoryHierarchy::from_config(&config, &dir);
    assert!(hierarchy.ad_caching());
    let resolver = Resolver::new(hierarchy, MockNames::knowing(&[ACC]));
    let response = request_for(&[ACC]).execute(&resolver).unwrap();

    let location = response.get_location(ACC, ACC, "sra").unwrap();
    assert_eq!(location.local.unwrap().read_path().unwrap(), user_copy);
    assert_eq!(
        location.cache.unwrap().read_path().unwrap(),
        dir.join(ACC).join(format!("{ACC}.sra"))
    );
}

#[test]
fn remote_record_gets_user_cache_target() {
    let (_temp, dir) = workdir();
    let hierarchy = RepositoryHierarchy::from_config(&user_repo_config("tmp"), &dir);
    let resolver = Resolver::new(hierarchy, MockNames::knowing(&[ACC]));
    let response = request_for(&[ACC]).execute(&resolver).unwrap();

    let location = response.get_location(ACC, ACC, "sra").unwrap();
    assert_eq!(location.local, Err(LocationError::NotFound));
    assert_eq!(
        location.cache.unwrap().read_path().unwrap(),
        dir.join("tmp").join("sra").join(format!("{ACC}.sra"))
    );
    assert_eq!(location.remote[0].link.scheme(), "https");
}

#[test]
fn unknown_accession_does_not_affect_siblings() {
    let (_temp, dir) = workdir();
    let hierarchy = RepositoryHierarchy::from_config(&user_repo_config("tmp"), &dir);
    let resolver = Resolver::new(hierarchy, MockNames::knowing(&[ACC]));
    let response = request_for(&[ACC, "SRR999999999"]).execute(&resolver).unwrap();

    assert_eq!(resolver.names().call_count(), 1);
    assert!(response.get_location(ACC, ACC, "sra").unwrap().cache.is_ok());

    let missing = response
        .get_location("SRR999999999", "SRR999999999", "sra")
        .unwrap();
    assert_eq!(missing.local, Err(LocationError::NotFound));
    assert_eq!(missing.cache, Err(LocationError::NotFound));
    assert_matches!(
        response.remote_status(&"SRR999999999".parse().unwrap()),
        Some(RemoteStatus::Failed(failure)) if failure.status == 404
    );
}

#[test]
fn transport_failure_keeps_local_hits() {
    let (_temp, dir) = workdir();
    let local_copy = dir.join(ACC).join(format!("{ACC}.sra"));
    touch(&local_copy);

    let resolver = Resolver::new(RepositoryHierarchy::new(&dir), MockNames::unavailable());
    let response = request_for(&[ACC, "SRR000001"]).execute(&resolver).unwrap();

    let location = response.get_location(ACC, ACC, "sra").unwrap();
    assert_eq!(location.local.unwrap().read_path().unwrap(), local_copy);
    assert_matches!(
        response.remote_status(&ACC.parse().unwrap()),
        Some(RemoteStatus::Unavailable(_))
    );

    let other = response.get_location("SRR000001", "SRR000001", "sra").unwrap();
    assert_eq!(other.local, Err(LocationError::NotFound));
    assert_eq!(other.cache, Err(LocationError::NoCacheRoot));
}

#[test]
fn transport_failure_still_reports_user_cache_target() {
    let (_temp, dir) = workdir();
    let hierarchy = RepositoryHierarchy::from_config(&user_repo_config("tmp"), &dir);
    let resolver = Resolver::new(hierarchy, MockNames::unavailable());
    let response = request_for(&[ACC]).execute(&resolver).unwrap();

    let location = response.get_location(ACC, ACC, "sra").unwrap();
    assert_eq!(location.local, Err(LocationError::NotFound));
    assert_eq!(
        location.cache.unwrap().read_path().unwrap(),
        dir.join("tmp").join("sra").join(format!("{ACC}.sra"))
    );
}

#[test]
fn local_only_miss_reports_user_cache_target() {
    let (_temp, dir) = workdir();
    let hierarchy = RepositoryHierarchy::from_config(&user_repo_config("tmp"), &dir);
    let resolver = Resolver::new(hierarchy, MockNames::knowing(&[ACC]));
    let mut request = request_for(&[ACC]);
    request.set_resolution_mode(true, false);
    let response = request.execute(&resolver).unwrap();

    assert_eq!(resolver.names().call_count(), 0);
    let location = response.get_location(ACC, ACC, "sra").unwrap();
    assert_eq!(location.local, Err(LocationError::NotFound));
    assert_eq!(
        location.cache.unwrap().read_path().unwrap(),
        dir.join("tmp").join("sra").join(format!("{ACC}.sra"))
    );
    assert_matches!(
        response.remote_status(&ACC.parse().unwrap()),
        Some(RemoteStatus::NotQueried)
    );
}

#[test]
fn prefer_local_skips_remote_for_local_hits() {
    let (_temp, dir) = workdir();
    touch(&dir.join(ACC).join(format!("{ACC}.sra")));

    let resolver = Resolver::new(RepositoryHierarchy::new(&dir), MockNames::knowing(&[ACC]));
    let mut request = request_for(&[ACC, "SRR000001"]);
    request.set_resolution_mode(true, true);
    let response = request.execute(&resolver).unwrap();

    let calls = resolver.names().calls.lock().unwrap().clone();
    assert_eq!(calls, vec![vec!["SRR000001".to_string()]]);
    assert_matches!(
        response.remote_status(&ACC.parse().unwrap()),
        Some(RemoteStatus::NotQueried)
    );
}

#[test]
fn local_path_round_trips_through_its_string_form() {
    let (_temp, dir) = workdir();
    let expected = dir.join("tmp").join("sra").join(format!("{ACC}.sra"));
    touch(&expected);

    let hierarchy = RepositoryHierarchy::from_config(&user_repo_config("tmp"), &dir);
    let resolver = Resolver::new(hierarchy.clone(), MockNames::default());
    let mut request = request_for(&[ACC]);
    request.set_resolution_mode(true, false);
    let response = request.execute(&resolver).unwrap();

    let local = response.get_location(ACC, ACC, "sra").unwrap().local.unwrap();
    let serialized = local.to_string();
    response.release();

    let reparsed: VirtualPath = serialized.parse().unwrap();
    let again = hierarchy
        .resolve_local(&ACC.parse().unwrap(), &"sra".parse().unwrap())
        .unwrap();
    assert_eq!(reparsed, again);
    assert!(reparsed.read_path().unwrap().as_std_path().is_file());
}

#[test]
fn response_serves_concurrent_readers() {
    let (_temp, dir) = workdir();
    let hierarchy = RepositoryHierarchy::from_config(&user_repo_config("tmp"), &dir);
    let resolver = Resolver::new(hierarchy, MockNames::knowing(&[ACC]));
    let response = request_for(&[ACC]).execute(&resolver).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let response = response.clone();
            std::thread::spawn(move || {
                response
                    .get_location(ACC, ACC, "sra")
                    .unwrap()
                    .cache
                    .unwrap()
                    .to_string()
            })
        })
        .collect();
    let paths: Vec<String> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    assert!(paths.windows(2).all(|pair| pair[0] == pair[1]));
}
