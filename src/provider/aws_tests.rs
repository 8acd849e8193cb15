// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `aws.rs` against a mocked Route53 endpoint

#[cfg(test)]
mod tests {
    use super::super::*;
    use aws_sdk_route53::config::retry::RetryConfig;
    use aws_sdk_route53::config::{BehaviorVersion, Credentials, Region};
    use wiremock::matchers::{body_string_contains, method, path, path_regex, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const XMLNS: &str = "https://route53.amazonaws.com/doc/2013-04-01/";

    fn client_for(server: &MockServer) -> AwsRoute53Client {
        let config = aws_sdk_route53::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .endpoint_url(server.uri())
            .retry_config(RetryConfig::disabled())
            .build();
        AwsRoute53Client::new(aws_sdk_route53::Client::from_conf(config))
    }

    fn xml(body: String) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/xml")
            .set_body_string(body)
    }

    fn record_set_xml(name: &str, record_type: &str, values: &[&str]) -> String {
        let records: String = values
            .iter()
            .map(|value| format!("<ResourceRecord><Value>{value}</Value></ResourceRecord>"))
            .collect();
        format!(
            "<ResourceRecordSet><Name>{name}</Name><Type>{record_type}</Type><TTL>300</TTL>\
             <ResourceRecords>{records}</ResourceRecords></ResourceRecordSet>"
        )
    }

    #[test]
    fn test_strip_zone_id_prefix() {
        assert_eq!(strip_zone_id_prefix("/hostedzone/Z123"), "Z123");
        assert_eq!(strip_zone_id_prefix("Z123"), "Z123");
    }

    #[tokio::test]
    async fn test_list_hosted_zones_by_name_converts_zones() {
        let server = MockServer::start().await;
        let body = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListHostedZonesByNameResponse xmlns="{XMLNS}">
  <HostedZones>
    <HostedZone>
      <Id>/hostedzone/Z1</Id>
      <Name>demo.example.com.</Name>
      <CallerReference>2025-01-01 00:00:00 UTC</CallerReference>
      <Config><Comment>management_cluster: mgmt</Comment><PrivateZone>false</PrivateZone></Config>
      <ResourceRecordSetCount>2</ResourceRecordSetCount>
    </HostedZone>
  </HostedZones>
  <DNSName>demo.example.com.</DNSName>
  <IsTruncated>false</IsTruncated>
  <MaxItems>100</MaxItems>
</ListHostedZonesByNameResponse>"#
        );
        Mock::given(method("GET"))
            .and(path("/2013-04-01/hostedzonesbyname"))
            .and(query_param("dnsname", "demo.example.com"))
            .respond_with(xml(body))
            .mount(&server)
            .await;

        let zones = client_for(&server)
            .list_hosted_zones_by_name("demo.example.com")
            .await
            .unwrap();

        assert_eq!(
            zones,
            vec![HostedZone {
                id: "Z1".to_string(),
                name: "demo.example.com.".to_string(),
                comment: Some("management_cluster: mgmt".to_string()),
                record_count: Some(2),
            }]
        );
    }

    #[tokio::test]
    async fn test_list_resource_record_sets_follows_pagination() {
        let server = MockServer::start().await;
        let first_page = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListResourceRecordSetsResponse xmlns="{XMLNS}">
  <ResourceRecordSets>{}</ResourceRecordSets>
  <IsTruncated>true</IsTruncated>
  <NextRecordName>www.demo.example.com.</NextRecordName>
  <NextRecordType>CNAME</NextRecordType>
  <MaxItems>1</MaxItems>
</ListResourceRecordSetsResponse>"#,
            record_set_xml(
                "demo.example.com.",
                "NS",
                &["ns-1.awsdns-01.org.", "ns-2.awsdns-02.net."]
            )
        );
        let second_page = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ListResourceRecordSetsResponse xmlns="{XMLNS}">
  <ResourceRecordSets>{}</ResourceRecordSets>
  <IsTruncated>false</IsTruncated>
  <MaxItems>1</MaxItems>
</ListResourceRecordSetsResponse>"#,
            record_set_xml(
                "\\052.demo.example.com.",
                "CNAME",
                &["ingress.demo.example.com."]
            )
        );

        Mock::given(method("GET"))
            .and(path_regex(r"^/2013-04-01/hostedzone/Z1/rrset/?$"))
            .and(query_param("name", "www.demo.example.com."))
            .respond_with(xml(second_page))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/2013-04-01/hostedzone/Z1/rrset/?$"))
            .respond_with(xml(first_page))
            .mount(&server)
            .await;

        let sets = client_for(&server)
            .list_resource_record_sets("Z1")
            .await
            .unwrap();

        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].record_type, RecordType::Ns);
        assert_eq!(
            sets[0].values,
            vec!["ns-1.awsdns-01.org.", "ns-2.awsdns-02.net."]
        );
        assert_eq!(sets[1].name, "*.demo.example.com.");
        assert_eq!(sets[1].record_type, RecordType::Cname);
    }

    #[tokio::test]
    async fn test_service_error_keeps_code_and_message() {
        let server = MockServer::start().await;
        let body = format!(
            r#"<?xml version="1.0"?>
<ErrorResponse xmlns="{XMLNS}">
  <Error><Type>Sender</Type><Code>Throttling</Code><Message>Rate exceeded</Message></Error>
  <RequestId>req-1</RequestId>
</ErrorResponse>"#
        );
        Mock::given(method("GET"))
            .and(path("/2013-04-01/hostedzonesbyname"))
            .respond_with(
                ResponseTemplate::new(400)
                    .insert_header("content-type", "text/xml")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_hosted_zones_by_name("demo.example.com")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ProviderError::Service {
                operation: "ListHostedZonesByName",
                code: "Throttling".to_string(),
                message: "Rate exceeded".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_change_resource_record_sets_posts_batch() {
        let server = MockServer::start().await;
        let body = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<ChangeResourceRecordSetsResponse xmlns="{XMLNS}">
  <ChangeInfo>
    <Id>/change/C1</Id>
    <Status>PENDING</Status>
    <SubmittedAt>2025-01-01T00:00:00.000Z</SubmittedAt>
  </ChangeInfo>
</ChangeResourceRecordSetsResponse>"#
        );
        Mock::given(method("POST"))
            .and(path_regex(r"^/2013-04-01/hostedzone/Z1/rrset/?$"))
            .and(body_string_contains("<Action>UPSERT</Action>"))
            .and(body_string_contains("<Value>10.0.0.1</Value>"))
            .respond_with(xml(body))
            .expect(1)
            .mount(&server)
            .await;

        let mut batch = ChangeBatch::new("Z1");
        batch.upsert(ResourceRecordSet::new(
            "api.demo.example.com",
            RecordType::A,
            Some(300),
            vec!["10.0.0.1".to_string()],
        ));

        client_for(&server)
            .change_resource_record_sets(&batch)
            .await
            .unwrap();
    }
}
